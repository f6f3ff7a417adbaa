use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Service Args ---
    /// Base URL of the fragrance service API
    #[arg(long, env = "PERF_API_URL", default_value = "http://localhost:8088")]
    pub base_url: String,

    /// User the conversations, threads and scent profile belong to
    #[arg(long, env = "PERF_USER_ID", default_value = "user-123")]
    pub user_id: String,

    /// Model the agent should answer with (e.g., gpt-4o, gpt-4o-mini)
    #[arg(long, env = "PERF_MODEL", default_value = "gpt-4o")]
    pub model: String,

    // --- Client State Args ---
    /// File remembering the current thread between runs
    #[arg(long, env = "PERF_STATE_PATH", default_value = ".perf-chat/thread.json")]
    pub state_path: String,

    /// Threads fetched per page
    #[arg(long, env = "PERF_THREAD_PAGE_SIZE", default_value = "20")]
    pub thread_page_size: u32,

    /// Feed items fetched per page
    #[arg(long, env = "PERF_FEED_PAGE_SIZE", default_value = "10")]
    pub feed_page_size: u32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Chat with the fragrance assistant (default). Ctrl-C stops a reply.
    Chat,

    /// List past conversations
    Threads {
        /// Case-insensitive filter on the thread summary
        #[arg(short, long, default_value = "")]
        query: String,

        /// Number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Print the messages of a thread (the current one when omitted)
    History {
        thread_id: Option<String>,
    },

    /// Browse the news feed
    Feed {
        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Show one feed article in full
    FeedItem {
        id: String,
    },

    /// Ask the service to write more feed articles
    GenerateFeed,

    /// Show the saved scent profile
    Profile,

    /// Take the scent profile quiz
    Quiz,
}
