use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use upload_tracker::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = app().get_matches();
    if let Err(e) = run(&matches).await {
        eprintln!("{}", Alert::from_error(&e));
        std::process::exit(1);
    }
}

fn app() -> Command<'static> {
    Command::new("upload-tracker")
        .about("Upload files to S3 and follow the progress of each file.")
        .arg(
            Arg::new("paths")
                .help("Files or directories to upload")
                .multiple_values(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON config file"),
        )
        .arg(Arg::new("bucket").long("bucket").takes_value(true))
        .arg(Arg::new("region").long("region").takes_value(true))
        .arg(
            Arg::new("level")
                .long("level")
                .takes_value(true)
                .possible_values(["public", "protected", "private"])
                .help("Access level of the uploaded objects"),
        )
        .arg(
            Arg::new("identity")
                .long("identity")
                .takes_value(true)
                .help("Identity that protected and private objects are scoped to"),
        )
        .arg(
            Arg::new("skip")
                .long("skip")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Dismiss the selected file at this position before uploading"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Upload to an in-memory store instead of S3"),
        )
        .arg(
            Arg::new("retry-failed")
                .long("retry-failed")
                .help("Retry failed uploads once"),
        )
        .arg(
            Arg::new("sign-out")
                .long("sign-out")
                .help("Sign out after uploading"),
        )
}

async fn run(matches: &ArgMatches) -> Result<(), Error> {
    let mut config = match matches.value_of("config") {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(bucket) = matches.value_of("bucket") {
        config.store.bucket = bucket.to_owned();
    }
    if let Some(region) = matches.value_of("region") {
        config.store.region = region.to_owned();
    }
    if let Some(level) = matches.value_of("level") {
        config.store.access_level = level.parse()?;
    }
    if let Some(identity) = matches.value_of("identity") {
        config.store.identity_id = Some(identity.to_owned());
    }

    let user = std::env::var("USER").unwrap_or_else(|_| "anonymous".to_string());
    let auth = LocalSession::new(&user);
    if matches.is_present("dry-run") {
        let store = MemoryStore::new(config.store.clone());
        session(UploadTracker::with_config(store, auth, config), matches).await
    } else {
        let store = S3Store::from_env(config.store.clone()).await;
        session(UploadTracker::with_config(store, auth, config), matches).await
    }
}

async fn session<S: ObjectStore, A: AuthClient>(
    mut tracker: UploadTracker<S, A>,
    matches: &ArgMatches,
) -> Result<(), Error> {
    let mut files = Vec::new();
    for path in matches.values_of("paths").into_iter().flatten() {
        for file in files_recursive(PathBuf::from(path)) {
            files.push(FileHandle::open(file).await?);
        }
    }
    tracker.choose(files);

    let mut skip = Vec::new();
    for value in matches.values_of("skip").into_iter().flatten() {
        skip.push(value.parse::<usize>().map_err(|_| Error::InvalidArgument {
            name: "--skip".to_string(),
            value: value.to_string(),
        })?);
    }
    // Highest position first, so earlier dismissals do not shift the later ones
    skip.sort_unstable_by(|a, b| b.cmp(a));
    skip.dedup();
    for position in skip {
        tracker.dismiss(position)?;
    }

    for token in render_selection(tracker.selection().items()) {
        println!("{}", token);
    }

    let printer = print_changes(tracker.ledger());
    let dispatch = tracker.dispatch_uploads()?;
    dispatch.finished().await;

    if matches.is_present("retry-failed") {
        let failed = tracker
            .ledger()
            .snapshot()
            .into_iter()
            .filter(|record| record.status == Status::Error)
            .map(|record| record.id)
            .collect::<Vec<_>>();
        for id in failed {
            tracker.retry(id)?.finished().await;
        }
    }
    printer.abort();

    println!();
    let records = tracker.ledger().snapshot();
    for row in render_ledger(&records) {
        println!("{}", row);
    }
    println!("{}", summarize(&records));

    if matches.is_present("sign-out") {
        tracker.sign_out().await?;
    }
    Ok(())
}

/// Print every row whose status or percentage changed, as snapshots come in.
fn print_changes(ledger: &Ledger) -> tokio::task::JoinHandle<()> {
    let mut rx = ledger.subscribe();
    tokio::spawn(async move {
        let mut shown: Vec<(Status, u8)> = Vec::new();
        while rx.changed().await.is_ok() {
            let records = rx.borrow_and_update().clone();
            for record in &records {
                let state = (record.status, record.percentage);
                if shown.get(record.id) != Some(&state) {
                    if record.id >= shown.len() {
                        shown.resize(record.id + 1, (Status::InProgress, 0));
                    }
                    shown[record.id] = state;
                    let mut row = ProgressRow::from(record);
                    row.link = None;
                    println!("{}", row);
                }
            }
        }
    })
}
