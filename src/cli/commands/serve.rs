//! Web server command.

use console::style;

use crate::config::Settings;

/// Port used when a bind address names only a host.
const DEFAULT_PORT: u16 = 8001;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or(&settings.bind);
    let (host, port) = parse_bind_address(bind)?;

    println!(
        "{} Starting fbmedia API at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Browser launches on the first request");
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "8001" -> 127.0.0.1:8001
/// - Just a host: "0.0.0.0" -> 0.0.0.0:8001
/// - Host and port: "0.0.0.0:8001"
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
        anyhow::bail!("Invalid port in bind address: {}", bind);
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}
