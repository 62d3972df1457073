//! UmaNakama: reads the event banner of the running game, works out which
//! trainee is on screen and which event is shown, and reports the event's
//! options together with the skills and conditions they mention.

pub mod assets;
pub mod capture;
pub mod config;
pub mod console;
pub mod gate;
pub mod prompt;
pub mod scan;
pub mod worker;

pub use config::Config;
pub use scan::{ScanOutcome, ScanResult, Scanner};
