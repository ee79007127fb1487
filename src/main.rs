use std::env;

#[tokio::main]
async fn main() {
    let mut args = env::args().skip(1);
    if args.next().as_deref() == Some("serve") {
        let port = args
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = takehome::api::run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    eprintln!("Usage: cargo run -- serve [port]");
    std::process::exit(1);
}
