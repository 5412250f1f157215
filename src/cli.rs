use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sensu-squadcast-handler",
    about = "Sends Sensu events to Squadcast",
    version = env!("GIT_DESCRIBE"),
    after_help = "The event is read as JSON from stdin unless --event-file is given.\n\n\
                  Per-check overrides: annotate the check or entity with\n  \
                  sensu.io/plugins/sensu-squadcast-handler/config/state-message\n  \
                  sensu.io/plugins/sensu-squadcast-handler/config/entity-id"
)]
pub struct Cli {
    /// The URL for the Squadcast API
    #[arg(short = 'a', long, env = "SENSU_SQUADCAST_APIURL", hide_env_values = true)]
    pub api_url: Option<String>,

    /// The template to use for the state message
    #[arg(
        short = 's',
        long,
        env = "SENSU_SQUADCAST_STATE_MESSAGE",
        help = "The template to use for the state message [default: {{entity.name}}:{{check.name}}:{{check.output}}]"
    )]
    pub state_message: Option<String>,

    /// The template to use for the Entity ID
    #[arg(
        short = 'e',
        long,
        env = "SENSU_SQUADCAST_ENTITY_ID",
        help = "The template to use for the Entity ID [default: {{entity.name}}/{{check.name}}]"
    )]
    pub entity_id: Option<String>,

    /// Path to config file
    #[arg(short, long, help = "Path to a YAML config file")]
    pub config: Option<PathBuf>,

    /// Read the event from a file instead of stdin
    #[arg(long)]
    pub event_file: Option<PathBuf>,

    /// Print the Squadcast payload instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}
