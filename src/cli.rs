// Command line arguments

use clap::Parser;

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(version, about = "Small HTTP/1.1 application server", long_about = None)]
pub struct Args {
    /// Config file path without extension (`config` reads `config.toml`)
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Address to bind, overrides `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, overrides `server.port`
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory served under the static prefix
    #[arg(long)]
    pub static_root: Option<String>,

    /// Keep notes in this JSON file instead of memory
    #[arg(long)]
    pub notes_file: Option<String>,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    pub check: bool,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            static_root: self.static_root.clone(),
            notes_file: self.notes_file.clone(),
        }
    }
}
