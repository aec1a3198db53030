//! Connection parameters for one tunnel session, as taken from the CLI.

#[derive(Debug, Clone)]
pub struct TunnelConfig {
    pub tunnel_host: String,
    pub tunnel_port: u16,
    pub local_port: u16,
}

impl TunnelConfig {
    /// `host:port` of the gateway's control listener.
    pub fn gateway_addr(&self) -> String {
        format!("{}:{}", self.tunnel_host, self.tunnel_port)
    }

    /// Base URL of the private origin this client relays REQUESTs to.
    pub fn local_origin(&self) -> String {
        format!("http://localhost:{}", self.local_port)
    }
}
