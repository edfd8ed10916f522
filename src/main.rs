use iterdns::dns::{QueryType, Question};
use iterdns::settings::Settings;
use iterdns::{Resolver, UdpTransport};

use clap::Parser;
use env_logger::Env;

use std::error::Error;
use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(version, about = "Resolve a domain name by following referrals from a root server")]
struct Args {
    /// Domain name to resolve, e.g. example.com
    name: String,

    /// Server to start at instead of the configured root hint
    #[arg(short, long)]
    server: Option<SocketAddr>,

    /// Print the decoded reply of the first server
    #[arg(long)]
    dump: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(args) {
        Ok(addr) => {
            println!("{}", addr);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<Ipv4Addr, Box<dyn Error>> {
    let settings = Settings::load()?;
    log::debug!("Settings loaded:\n{:?}", settings);

    let transport = UdpTransport::from_settings(&settings)?;
    let resolver = Resolver::from_settings(transport, &settings);

    let server = args.server.unwrap_or(settings.root_server);
    let question = Question::new(args.name, QueryType::A);

    if args.dump {
        let response = resolver.query(&question, server)?;
        print!("{}", response);
    }

    Ok(resolver.resolve(&question, server)?)
}
