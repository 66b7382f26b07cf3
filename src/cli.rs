//! Command line interface
//!
//! Every command maps to a location in the app (see [`Commands::route`]) so a
//! forced logout can say where to come back to.

use crate::routes;
use clap::{Args, Parser, Subcommand};

/// Conduit CLI
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(about = "Command line client for the RealWorld Conduit API", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the Conduit API
    #[arg(long, global = true, env = "CONDUIT_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with email and password
    Login(LoginArgs),
    /// Create an account
    Register(RegisterArgs),
    /// Forget the stored session
    Logout,
    /// Show the logged in user
    Whoami,
    /// Exchange the refresh cookie for a new access token
    Refresh,
    /// Update your account
    Settings(SettingsArgs),
    /// List articles
    Articles(ArticlesArgs),
    /// Show one article
    Article(SlugArgs),
    /// Publish a new article
    Publish(PublishArgs),
    /// Edit one of your articles
    Edit(EditArgs),
    /// Delete one of your articles
    Delete(SlugArgs),
    /// Favorite an article
    Favorite(SlugArgs),
    /// Remove an article from your favorites
    Unfavorite(SlugArgs),
    /// List comments on an article
    Comments(SlugArgs),
    /// Comment on an article
    Comment(CommentArgs),
    /// Delete one of your comments
    Uncomment(UncommentArgs),
    /// Show a profile
    Profile(UserArgs),
    /// Follow a user
    Follow(UserArgs),
    /// Unfollow a user
    Unfollow(UserArgs),
    /// List popular tags
    Tags,
}

impl Commands {
    /// Location in the app this command stands for
    pub fn route(&self) -> String {
        match self {
            Commands::Login(_) => routes::LOGIN.to_string(),
            Commands::Register(_) => routes::REGISTER.to_string(),
            Commands::Settings(_) => routes::SETTINGS.to_string(),
            Commands::Articles(args) => match (&args.author, &args.favorited) {
                (Some(author), _) => routes::profile(author),
                (None, Some(username)) => routes::profile_favorites(username),
                (None, None) => routes::HOME.to_string(),
            },
            Commands::Article(args)
            | Commands::Delete(args)
            | Commands::Favorite(args)
            | Commands::Unfavorite(args)
            | Commands::Comments(args) => routes::article(&args.slug),
            Commands::Comment(args) => routes::article(&args.slug),
            Commands::Uncomment(args) => routes::article(&args.slug),
            Commands::Publish(_) => routes::EDITOR.to_string(),
            Commands::Edit(args) => routes::editor(&args.slug),
            Commands::Profile(args) | Commands::Follow(args) | Commands::Unfollow(args) => {
                routes::profile(&args.username)
            }
            Commands::Logout | Commands::Whoami | Commands::Refresh | Commands::Tags => routes::ROOT.to_string(),
        }
    }
}

/// Login command arguments
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(short = 'e', long)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(short = 'p', long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    #[arg(short = 'u', long)]
    pub username: String,

    #[arg(short = 'e', long)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(short = 'p', long)]
    pub password: Option<String>,
}

/// Account fields to change; at least one is required
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    #[arg(short = 'e', long)]
    pub email: Option<String>,

    #[arg(short = 'p', long)]
    pub password: Option<String>,

    #[arg(short = 'b', long)]
    pub bio: Option<String>,

    /// Avatar URL
    #[arg(short = 'i', long)]
    pub image: Option<String>,
}

/// Article list filters
#[derive(Args, Debug, Clone)]
pub struct ArticlesArgs {
    /// Articles from users you follow (requires login)
    #[arg(long, conflicts_with_all = ["tag", "author", "favorited"])]
    pub feed: bool,

    #[arg(short = 't', long)]
    pub tag: Option<String>,

    #[arg(short = 'a', long)]
    pub author: Option<String>,

    /// Articles favorited by this user
    #[arg(short = 'f', long)]
    pub favorited: Option<String>,

    #[arg(short = 'l', long, default_value_t = 20)]
    pub limit: u32,

    #[arg(short = 'o', long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(Args, Debug, Clone)]
pub struct SlugArgs {
    pub slug: String,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    #[arg(short = 't', long)]
    pub title: String,

    #[arg(short = 'd', long)]
    pub description: String,

    /// Markdown body
    #[arg(short = 'b', long)]
    pub body: String,

    /// Repeat for several tags
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub slug: String,

    #[arg(short = 't', long)]
    pub title: Option<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(short = 'b', long)]
    pub body: Option<String>,

    /// Replaces all tags; repeat for several
    #[arg(long = "tag")]
    pub tags: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    pub slug: String,

    #[arg(short = 'b', long)]
    pub body: String,
}

#[derive(Args, Debug, Clone)]
pub struct UncommentArgs {
    pub slug: String,
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("conduit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_login_args() {
        let cli = parse(&["login", "-e", "jake@jake.jake", "-p", "jakejake"]);
        match cli.command {
            Some(Commands::Login(args)) => {
                assert_eq!(args.email, "jake@jake.jake");
                assert_eq!(args.password.as_deref(), Some("jakejake"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&["tags", "--api-url", "http://example.com/api", "--timeout", "3", "-v"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://example.com/api"));
        assert_eq!(cli.timeout, Some(3));
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_articles_defaults_and_feed_conflicts() {
        let cli = parse(&["articles", "--tag", "dragons"]);
        match cli.command {
            Some(Commands::Articles(args)) => {
                assert_eq!(args.limit, 20);
                assert_eq!(args.offset, 0);
                assert_eq!(args.tag.as_deref(), Some("dragons"));
                assert!(!args.feed);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let result = Cli::try_parse_from(["conduit", "articles", "--feed", "--tag", "dragons"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_publish_collects_tags() {
        let cli = parse(&["publish", "-t", "T", "-d", "D", "-b", "B", "--tag", "a", "--tag", "b"]);
        match cli.command {
            Some(Commands::Publish(args)) => assert_eq!(args.tags, vec!["a".to_string(), "b".to_string()]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_routes() {
        assert_eq!(parse(&["article", "hello"]).command.unwrap().route(), "/article/hello");
        assert_eq!(parse(&["edit", "hello", "-t", "x"]).command.unwrap().route(), "/editor/hello");
        assert_eq!(parse(&["publish", "-t", "T", "-d", "D", "-b", "B"]).command.unwrap().route(), "/editor/");
        assert_eq!(parse(&["follow", "jake"]).command.unwrap().route(), "/profile/jake");
        assert_eq!(parse(&["articles", "-f", "jake"]).command.unwrap().route(), "/profile/jake/favorites/");
        assert_eq!(parse(&["settings", "--bio", "hi"]).command.unwrap().route(), "/settings/");
        assert_eq!(parse(&["tags"]).command.unwrap().route(), "/");
    }
}
