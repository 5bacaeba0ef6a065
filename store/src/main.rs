use std::{
    io::{self, Write},
    process::exit,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

pub mod catalog;
pub mod cli;
pub mod pacing;

use cli::Args;
use pacing::{pause, CONSUME_PAUSE, PRODUCE_PAUSE, SPAWN_PAUSE};
use shared::{
    process::{self, Child},
    Store, StoreError, STORE_CAPACITY,
};

type DemoStore = Store<STORE_CAPACITY>;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let region = DemoStore::allocate().context("Failed to allocate shared memory")?;
    info!(
        bytes = region.size(),
        capacity = region.get().capacity(),
        "Initialized shared store"
    );

    let seed: u64 = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    println!("Seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let store = region.get();
    let mut consumers = Vec::with_capacity(args.consumers as usize);

    for id in 1..=args.consumers {
        pause(&mut rng, SPAWN_PAUSE, args.time_scale);
        // children inherit unflushed output otherwise
        io::stdout().flush()?;

        match process::spawn(|| consumer(id, store, seed, args.time_scale)) {
            Ok(child) => {
                info!(consumer = id, pid = child.pid(), "Spawned consumer");
                consumers.push(child);
            }
            Err(e) => {
                store.close();
                if let Err(join_err) = join(consumers) {
                    region.abandon();
                    return Err(join_err);
                }
                return Err(e).with_context(|| format!("Failed to spawn consumer {id}"));
            }
        }
    }

    // Installed after forking: the handler thread would not survive fork anyway
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        if s.swap(true, Ordering::Relaxed) {
            eprintln!("Killing");
            exit(1);
        } else {
            eprintln!("CTRL-C received, closing the store (press again to kill)");
        }
    })?;

    let produced = producer(store, &args, &mut rng, &stop);
    info!(produced, "Producer finished, closing store");

    store.close();
    if let Err(e) = join(consumers) {
        // a consumer may still be attached, so its semaphores must survive
        region.abandon();
        return Err(e);
    }
    region.release();

    Ok(())
}

fn producer(store: &DemoStore, args: &Args, rng: &mut StdRng, stop: &AtomicBool) -> u64 {
    let mut produced = 0;

    while !stop.load(Ordering::Relaxed) {
        if args.items.is_some_and(|limit| produced >= limit) {
            break;
        }

        let (name, price) = catalog::pick(rng);
        let item = store.create_item(name, price);
        if let Err(e) = store.insert(item) {
            warn!(error = %e, "Insert rejected");
            break;
        }
        debug!(id = item.id(), name, price, "Stocked item");
        produced += 1;

        pause(rng, PRODUCE_PAUSE, args.time_scale);
    }

    produced
}

fn consumer(id: u32, store: &DemoStore, seed: u64, time_scale: f64) -> i32 {
    unsafe {
        // Shutdown is driven by the producer closing the store
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM as libc::c_ulong);
    }

    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(id as u64));
    let mut consumed = 0u64;

    loop {
        match store.remove() {
            Ok(item) => {
                println!("============= Customer {id} =============\n{item}");
                consumed += 1;
                pause(&mut rng, CONSUME_PAUSE, time_scale);
            }
            Err(StoreError::Closed) => break,
            Err(e) => {
                warn!(consumer = id, error = %e, "Consumer failed");
                return 1;
            }
        }
    }

    info!(consumer = id, consumed, "Consumer left the store");
    0
}

/// Reaps every consumer, then reports the first one that could not be waited on.
fn join(consumers: Vec<Child>) -> anyhow::Result<()> {
    let mut first_error = None;
    for (pid, result) in process::wait_all(consumers) {
        match result {
            Ok(status) if status.success() => debug!(pid, "Consumer exited"),
            Ok(status) => warn!(pid, %status, "Consumer exited abnormally"),
            Err(e) => {
                warn!(pid, error = %e, "Failed to wait for consumer");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e).context("Failed to join consumers"),
        None => Ok(()),
    }
}
