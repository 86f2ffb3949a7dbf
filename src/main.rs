use clap::Parser;
use msianalyzer_web::cli::{Args, Commands};
use msianalyzer_web::commands;
use msianalyzer_web::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(default_level: &str, log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (default_level, config_path) = match &args.command {
        Commands::Serve { config, .. } => ("info", config.clone()),
        Commands::Run { config, .. } | Commands::Check { config } => ("warn", config.clone()),
        _ => ("warn", None),
    };
    // Config errors are reported by the command itself.
    let log_json = Config::resolve(config_path.as_deref())
        .map(|config| config.log_json)
        .unwrap_or(false);
    init_tracing(default_level, log_json);

    let result = match args.command {
        Commands::Serve { config, bind } => commands::serve::run(config, bind).await,
        Commands::Run {
            marker,
            marker_config,
            min_similarity,
            anchor_units,
            threads,
            run_tests,
            skip_variant_summary,
            group_map,
            pileup,
            output_dir,
            config,
            fastq,
        } => {
            let options = commands::run::RunOptions {
                marker,
                marker_config,
                min_similarity,
                anchor_units,
                threads,
                run_tests,
                skip_variant_summary,
                group_map,
                pileup,
                output_dir,
                config,
                fastq,
            };
            commands::run::run(options).await
        }
        Commands::Markers => commands::markers::run(),
        Commands::Check { config } => commands::check::run(config),
        Commands::InitConfig => commands::init_config::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
