//! Terminal front-end for the client library: one function per subcommand.

use log::{ error, warn };
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader, Lines, Stdin };

use crate::api::PerfApi;
use crate::cli::Args;
use crate::error::StoreError;
use crate::feed::FeedBrowser;
use crate::models::chat::{ ChatMessage, Role };
use crate::models::feed::FeedItem;
use crate::models::preferences::{ Longevity, ScentProfile, Sillage };
use crate::quiz::{ ScentQuiz, ELEMENTS, SCENES, TOTAL_STEPS, VIBES };
use crate::session::{ SessionConfig, StreamOutcome, StreamingChatSession };
use crate::store::ThreadStore;
use crate::threads::ThreadDirectory;

type AppResult = Result<(), Box<dyn Error + Send + Sync>>;
type Input = Lines<BufReader<Stdin>>;

fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>, std::io::Error> {
    print!("{}", text);
    std::io::stdout().flush()?;
    input.next_line().await
}

fn print_messages(messages: &[ChatMessage]) {
    for message in messages {
        let speaker = match message.role {
            Role::Human => "you",
            Role::Assistant => "assistant",
        };
        println!("{}: {}\n", speaker, message.content);
    }
}

pub async fn chat(args: &Args, api: Arc<dyn PerfApi>, store: Arc<dyn ThreadStore>) -> AppResult {
    let directory = Arc::new(ThreadDirectory::new(api.clone(), &args.user_id, args.thread_page_size));
    let session = StreamingChatSession::with_observer(
        api,
        store,
        directory.clone(),
        SessionConfig {
            model: args.model.clone(),
            user_id: args.user_id.clone(),
        }
    );

    if let Some(thread_id) = session.snapshot().thread_id {
        println!("Resuming thread {}", thread_id);
        if session.load_history(&thread_id).await.is_ok() {
            print_messages(&session.snapshot().messages);
        }
    }
    println!("Commands: /new, /threads, /switch <thread id>, /quit. Ctrl-C stops a reply.");

    let interrupts = tokio::spawn({
        let session = session.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if on_interrupt(&session) {
                    println!();
                    std::process::exit(130);
                }
            }
        }
    });

    let mut input = stdin_lines();
    while let Some(line) = prompt(&mut input, "> ").await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/new" => {
                session.new_thread()?;
                println!("Started a new conversation");
            }
            "/threads" => {
                if directory.load_threads(true, None).await.is_ok() {
                    print_threads(&directory);
                }
            }
            _ if line.starts_with("/switch ") => {
                let thread_id = line.trim_start_matches("/switch ").trim();
                match session.switch_thread(thread_id).await {
                    Ok(_) => print_messages(&session.snapshot().messages),
                    Err(e) => eprintln!("Could not open thread {}: {}", thread_id, e),
                }
            }
            text => stream_reply(&session, text).await,
        }
    }

    interrupts.abort();
    session.cancel();
    Ok(())
}

/// Ctrl-C stops the reply being streamed. Returns true when nothing was
/// streaming and the program should exit.
fn on_interrupt(session: &StreamingChatSession) -> bool {
    if session.is_loading() {
        session.cancel();
        false
    } else {
        true
    }
}

/// Sends one message and prints the reply as it grows.
async fn stream_reply(session: &StreamingChatSession, text: &str) {
    let reply_index = session.snapshot().messages.len() + 1;
    let mut updates = session.subscribe();

    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let Some(reply) = snapshot.messages.get(reply_index) else {
                continue;
            };
            if reply.content.len() > printed {
                print!("{}", &reply.content[printed..]);
                let _ = std::io::stdout().flush();
                printed = reply.content.len();
            }
            if !snapshot.is_loading {
                break;
            }
        }
        println!();
    });

    let outcome = session.submit(text).await;
    if outcome.is_err() {
        printer.abort();
    }
    let _ = printer.await;

    match outcome {
        Ok(StreamOutcome::Completed) | Ok(StreamOutcome::Ended) => {}
        Ok(StreamOutcome::Cancelled) => println!("(stopped)"),
        Ok(StreamOutcome::Failed(e)) => eprintln!("(reply failed: {})", e),
        Err(e) => eprintln!("{}", e),
    }
}

fn print_threads(directory: &ThreadDirectory) {
    let threads = directory.threads();
    if threads.is_empty() {
        println!("No conversations found.");
    }
    for thread in threads {
        let created = thread.create_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}  {:16}  {}", thread.thread_id, created, thread.summary);
    }
    if !directory.has_more() {
        println!("-- end of conversations --");
    }
}

pub async fn threads(args: &Args, api: Arc<dyn PerfApi>, query: &str, pages: u32) -> AppResult {
    let directory = ThreadDirectory::new(api, &args.user_id, args.thread_page_size);
    directory.load_threads(true, Some(query)).await?;
    for _ in 1..pages {
        if !directory.has_more() {
            break;
        }
        directory.load_threads(false, None).await?;
    }
    print_threads(&directory);
    Ok(())
}

/// An explicit id wins; the store is only read without one.
fn history_thread(explicit: Option<String>, store: &dyn ThreadStore) -> Result<Option<String>, StoreError> {
    match explicit {
        Some(id) => Ok(Some(id)),
        None => store.current(),
    }
}

pub async fn history(
    args: &Args,
    api: Arc<dyn PerfApi>,
    store: Arc<dyn ThreadStore>,
    thread_id: Option<String>
) -> AppResult {
    let thread_id = match history_thread(thread_id, store.as_ref())? {
        Some(id) => id,
        None => {
            println!("No current thread. Pass a thread id.");
            return Ok(());
        }
    };
    let session = StreamingChatSession::new(api, store, SessionConfig {
        model: args.model.clone(),
        user_id: args.user_id.clone(),
    });
    session.load_history(&thread_id).await?;
    print_messages(&session.snapshot().messages);
    Ok(())
}

fn print_feed_item(item: &FeedItem) {
    println!("[{}] {} ({})", item.kind, item.title, item.id);
    println!("  {}", item.summary);
    if !item.tags.is_empty() {
        println!("  tags: {}", item.tags.join(", "));
    }
}

pub async fn feed(args: &Args, api: Arc<dyn PerfApi>, query: &str, pages: u32) -> AppResult {
    let browser = FeedBrowser::new(api, args.feed_page_size);
    browser.load_feed(true, Some(query)).await?;
    for _ in 1..pages {
        if !browser.has_more() {
            break;
        }
        if let Err(e) = browser.load_feed(false, None).await {
            warn!("Stopped paging the feed: {}", e);
            break;
        }
    }
    for item in browser.items() {
        print_feed_item(&item);
    }
    if browser.items().is_empty() {
        println!("The feed is empty. Try `generate-feed`.");
    }
    Ok(())
}

pub async fn feed_item(api: Arc<dyn PerfApi>, id: &str) -> AppResult {
    let item = FeedBrowser::new(api, 1).item(id).await?;
    print_feed_item(&item);
    if let Some(url) = &item.image_url {
        println!("  image: {}", url);
    }
    if let Some(content) = &item.content {
        println!("\n{}", content);
    }
    Ok(())
}

pub async fn generate_feed(api: Arc<dyn PerfApi>) -> AppResult {
    FeedBrowser::new(api, 1).generate().await?;
    println!("Feed generation started; new items appear shortly.");
    Ok(())
}

fn print_profile(profile: &ScentProfile) {
    println!("vibe:      {}", profile.vibe);
    println!("scene:     {}", profile.scene);
    println!("elements:  {}", profile.elements.join(", "));
    println!("loved:     {}", profile.loved.as_deref().unwrap_or("-"));
    println!("disliked:  {}", profile.disliked.as_deref().unwrap_or("-"));
    println!("sillage:   {:?}", profile.sillage);
    println!("longevity: {:?}", profile.longevity);
    println!("notes:     {}", profile.additional.as_deref().unwrap_or("-"));
}

pub async fn profile(args: &Args, api: Arc<dyn PerfApi>) -> AppResult {
    match api.scent_profile(&args.user_id).await? {
        Some(profile) => print_profile(&profile),
        None => println!("No scent profile yet. Run `quiz` to create one."),
    }
    Ok(())
}

fn pick<'a>(options: &[(&'a str, &str)], answer: &str) -> Option<&'a str> {
    let index: usize = answer.trim().parse().ok()?;
    options.get(index.checked_sub(1)?).map(|(value, _)| *value)
}

fn list_options(options: &[(&str, &str)]) {
    for (i, (_, label)) in options.iter().enumerate() {
        println!("  {}. {}", i + 1, label);
    }
}

pub async fn quiz(args: &Args, api: Arc<dyn PerfApi>) -> AppResult {
    let mut quiz = ScentQuiz::new();
    match api.scent_profile(&args.user_id).await {
        Ok(Some(saved)) => quiz.initialize(saved),
        Ok(None) => {}
        Err(e) => warn!("Could not load saved answers: {}", e),
    }

    let mut input = stdin_lines();
    println!("Type `b` to go back.");
    loop {
        println!("\nStep {} of {} ({:.0}%)", quiz.step(), TOTAL_STEPS, quiz.progress());
        let step = quiz.step();
        let answer = match step {
            1 => {
                println!("What vibe are you after?");
                list_options(VIBES);
                prompt(&mut input, "> ").await?
            }
            2 => {
                println!("Pick the scene that feels right.");
                list_options(SCENES);
                prompt(&mut input, "> ").await?
            }
            3 => {
                println!("Which elements do you enjoy? (numbers separated by commas toggle them)");
                list_options(ELEMENTS);
                println!("  selected: {}", quiz.answers().elements.join(", "));
                prompt(&mut input, "> ").await?
            }
            4 => prompt(&mut input, "Fragrances you love: ").await?,
            5 => {
                println!("How far should it project? 1. Soft  2. Moderate  3. Strong");
                prompt(&mut input, "> ").await?
            }
            _ => prompt(&mut input, "Anything else we should know? ").await?,
        };
        let Some(answer) = answer else {
            println!("Quiz abandoned.");
            return Ok(());
        };
        if answer.trim() == "b" {
            quiz.back();
            continue;
        }

        match step {
            1 => {
                if let Some(vibe) = pick(VIBES, &answer) {
                    quiz.set_vibe(vibe);
                }
            }
            2 => {
                if let Some(scene) = pick(SCENES, &answer) {
                    quiz.set_scene(scene);
                }
            }
            3 => {
                for part in answer.split(',') {
                    if let Some(element) = pick(ELEMENTS, part) {
                        quiz.toggle_element(element);
                    }
                }
            }
            4 => {
                quiz.set_loved(&answer);
                if let Some(disliked) = prompt(&mut input, "Fragrances you dislike: ").await? {
                    quiz.set_disliked(&disliked);
                }
            }
            5 => {
                match answer.trim() {
                    "1" => quiz.set_sillage(Sillage::Soft),
                    "2" => quiz.set_sillage(Sillage::Moderate),
                    "3" => quiz.set_sillage(Sillage::Strong),
                    _ => {}
                }
                println!("How long should it last? 1. Intimate  2. Moderate  3. Long-lasting");
                match prompt(&mut input, "> ").await?.as_deref().map(str::trim) {
                    Some("1") => quiz.set_longevity(Longevity::Intimate),
                    Some("2") => quiz.set_longevity(Longevity::Moderate),
                    Some("3") => quiz.set_longevity(Longevity::LongLasting),
                    _ => {}
                }
            }
            _ => {
                quiz.set_additional(&answer);
                match quiz.submit(api.as_ref(), &args.user_id).await {
                    Ok(saved) => {
                        println!("Profile saved!");
                        print_profile(&saved);
                        return Ok(());
                    }
                    Err(e) => {
                        error!("Save failed: {}", e);
                        println!("Could not save your profile. Press enter to retry or `b` to go back.");
                        continue;
                    }
                }
            }
        }

        if quiz.next().is_err() {
            println!("Please answer this step before continuing.");
        }
    }
}
