mod commands;
mod terminal;

use commands::{CommandLine, Commands, interfaces, listen};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);
    print::banner();

    match commands.command {
        Commands::Interfaces => {
            print::header("network interfaces");
            interfaces::interfaces();
            Ok(())
        }
        Commands::Listen(args) => {
            print::header("starting listener");
            listen::listen(args).await
        }
    }
}
