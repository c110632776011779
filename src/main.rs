use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::time::Duration;

use gitprof::{
    commands::{self, Context},
    logging::init_logging,
    lookup::GitHubLookup,
    paths::Paths,
    prompt::Prompter,
    runner::SystemRunner,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "gitprof")]
#[command(about = "Git profile manager - switch SSH keys and committer identities per repository")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Show debug logs (GITPROF_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a Git repository with a profile
    Clone {
        /// Repository URL, ending in .git
        repo: String,

        /// Which profile to clone the repo with
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Add, delete or modify a profile
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Work with the config file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Check the gitprof setup for problems
    Doctor,

    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Add a new profile
    Create {
        name: String,

        /// Your username for the service (e.g. GitHub)
        #[arg(long)]
        username: Option<String>,
    },

    /// Apply a profile to the repository in the current directory
    Apply {
        /// The profile to apply
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Delete one or more profiles
    Rm {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List your profiles
    Ls {
        /// List profile names only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Edit an existing profile
    Edit {
        name: String,

        /// Committer name to use for this profile
        #[arg(long)]
        git_name: Option<String>,

        /// Committer email to use for this profile
        #[arg(long)]
        git_email: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Open the config file in an editor
    Edit {
        /// Editor to use instead of $EDITOR
        editor: Option<String>,
    },

    /// Delete the config file
    Rm {
        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ui = Ui::new(cli.color, cli.no_color);
    init_logging(cli.verbose, ui.color_enabled);

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "gitprof", &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new()?;
    if let Commands::Doctor = cli.command {
        return commands::doctor(&paths, &ui);
    }

    let mut runner = SystemRunner::new();
    let lookup = GitHubLookup;
    let mut ctx = Context {
        paths: &paths,
        ui: &ui,
        prompter: Prompter::stdio(),
        runner: &mut runner,
        lookup: &lookup,
        work_dir: std::env::current_dir()?,
        pause: Duration::from_secs(2),
    };

    match cli.command {
        Commands::Clone { repo, profile } => commands::clone(&mut ctx, &repo, profile.as_deref()),
        Commands::Profile(cmd) => match cmd {
            ProfileCommands::Create { name, username } => {
                commands::profile_create(&mut ctx, &name, username.as_deref())
            }
            ProfileCommands::Apply { profile } => commands::profile_apply(&mut ctx, profile.as_deref()),
            ProfileCommands::Rm { names } => commands::profile_rm(&mut ctx, &names),
            ProfileCommands::Ls { quiet } => commands::profile_ls(&mut ctx, quiet),
            ProfileCommands::Edit {
                name,
                git_name,
                git_email,
            } => commands::profile_edit(&mut ctx, &name, git_name.as_deref(), git_email.as_deref()),
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Edit { editor } => commands::config_edit(&mut ctx, editor.as_deref()),
            ConfigCommands::Rm { yes } => commands::config_rm(&mut ctx, yes),
        },
        Commands::Doctor | Commands::Completions { .. } => Ok(()),
    }
}
