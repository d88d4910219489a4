use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
};

use clap::Parser;

/// Keeps a per-connection ledger of prices and answers range-average queries.
#[derive(Parser, Debug)]
#[command(name = "price-ledger", version)]
pub struct Config {
    /// Port to listen on (1024-65535)
    #[arg(value_parser = clap::value_parser!(u16).range(1024..=65535))]
    pub port: u16,

    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Refuse new connections while this many are open
    #[arg(long)]
    pub max_connections: Option<NonZeroUsize>,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections.map(NonZeroUsize::get)
    }
}
