use clap::Parser;
use pdf2gtfs::cli::CliArgs;
use pdf2gtfs::pipeline;

fn main() {
    env_logger::init();

    let args = CliArgs::parse();
    log::debug!("cwd: {:?}", std::env::current_dir());

    let exit_code = match pipeline::run(&args) {
        Ok(feed) => {
            log::info!(
                "wrote {} stops, {} trips to {:?}",
                feed.stops.len(),
                feed.trips.len(),
                args.output
            );
            0
        }
        Err(e) => {
            log::error!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}
