// ABOUTME: Entry point for the skybridge binary.
// ABOUTME: Parses CLI arguments, initializes tracing, signs in, and runs the post workflow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use skybridge_client::{
    AtprotoRecordBuilder, HttpPageApi, IntentPopup, PostWorkflow, SessionProvider,
    SkybridgeConfig, StaticSession, XrpcClient,
};
use skybridge_core::{
    ComposerState, GraphemeCounter, ImageBlob, POST_GRAPHEME_LIMIT, Segmentation,
};

#[derive(Debug, Parser)]
#[command(name = "skybridge", version, about = "Post to Bluesky and prepare an X share link")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compose and submit a post.
    Post(PostArgs),
    /// Count the characters of a post the way the limit check does.
    Count {
        text: String,
        /// Count UTF-16 code units instead of graphemes.
        #[arg(long)]
        code_units: bool,
    },
}

#[derive(Debug, Args)]
struct PostArgs {
    /// Post text.
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,
    /// Read the post text from a file.
    #[arg(long)]
    text_file: Option<PathBuf>,
    /// Image to attach; repeat for up to four.
    #[arg(long = "image")]
    images: Vec<PathBuf>,
    /// Alt text, paired with --image by position.
    #[arg(long = "alt")]
    alts: Vec<String>,
    /// Open the X share intent after posting.
    #[arg(long)]
    auto_popup: bool,
    /// Attach your own image on X; skips share page generation.
    #[arg(long)]
    no_generate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skybridge=info,skybridge_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Post(args) => post(args).await,
        Command::Count { text, code_units } => {
            let segmentation = if code_units {
                Segmentation::CodeUnits
            } else {
                Segmentation::Graphemes
            };
            let count = GraphemeCounter::new(segmentation).count(&text);
            println!("{}/{}", count, POST_GRAPHEME_LIMIT);
            Ok(())
        }
    }
}

async fn post(args: PostArgs) -> anyhow::Result<()> {
    let config = SkybridgeConfig::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let text = match (&args.text, &args.text_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
            .trim_end()
            .to_string(),
        (None, None) => String::new(),
    };

    let mut images = Vec::with_capacity(args.images.len());
    for (i, path) in args.images.iter().enumerate() {
        let alt = args.alts.get(i).cloned().unwrap_or_default();
        images.push(load_image(path, alt).await?);
    }

    let mut state = ComposerState::default();
    state.set_text(text);
    state.set_images(images)?;
    state.set_auto_popup(args.auto_popup);
    state.set_suppress_card_generation(args.no_generate);

    if state.draft().is_empty() {
        bail!("nothing to post: give --text, --text-file, or --image");
    }
    if state.over_limit() {
        bail!("post is {}/{} characters", state.count(), POST_GRAPHEME_LIMIT);
    }

    let xrpc = Arc::new(XrpcClient::new(config.pds_url.clone(), config.http_timeout)?);
    let sessions = StaticSession::new(config.credentials.establish(&xrpc).await?);
    let Some(session) = sessions.session() else {
        bail!(
            "not signed in: set SKYBRIDGE_IDENTIFIER and SKYBRIDGE_APP_PASSWORD, \
             or SKYBRIDGE_DID and SKYBRIDGE_ACCESS_JWT"
        );
    };

    let builder = Arc::new(AtprotoRecordBuilder::new(xrpc.clone(), config.http_timeout)?);
    let pages = Arc::new(HttpPageApi::new(config.page_api_url.clone(), config.http_timeout)?);
    let workflow = PostWorkflow::new(
        builder,
        xrpc,
        pages,
        Arc::new(IntentPopup),
        config.share_pages.clone(),
    );

    let mut rx = workflow.status().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) if msg.is_error => eprintln!("{}", msg.text),
                Ok(msg) => println!("{}", msg.text),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = workflow.submit(&mut state, Some(&session)).await;
    // Dropping the workflow closes the status feed and ends the printer.
    drop(workflow);
    let _ = printer.await;

    let share = result?;
    if !share.url.is_empty() {
        println!("url: {}", share.url);
    }
    println!("text: {}", share.content);
    println!("share: {}", skybridge_client::intent_url(&share));
    Ok(())
}

async fn load_image(path: &Path, alt: String) -> anyhow::Result<ImageBlob> {
    let mime_type = mime_for_path(path)
        .with_context(|| format!("unsupported image type: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImageBlob {
        file_name,
        mime_type: mime_type.to_string(),
        bytes,
        alt,
    })
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
