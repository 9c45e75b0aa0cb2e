use clap::Parser;
use clawgate::cli::{
    backends, handle_config_init, handle_config_validate, Cli, Commands, ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => clawgate::cli::serve::run_serve(args).await,
        Commands::Backends(args) => backends::handle_backends(&args).map(|output| {
            println!("{}", output);
        }),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
            ConfigCommands::Validate(args) => handle_config_validate(&args).map(|summary| {
                println!("{}", summary);
            }),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
