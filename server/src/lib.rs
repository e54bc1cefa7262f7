pub mod cms;
pub mod net;
pub mod reload;
pub mod server;
pub mod site;
pub mod watcher;
pub mod worker;
