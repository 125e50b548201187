//! Reuses request buffers across worker threads through a shared pool.

use std::sync::LazyLock;
use std::thread;

use recycling_pool::RecyclingPool;

static BUFFERS: LazyLock<RecyclingPool<Vec<u8>>> =
    LazyLock::new(|| RecyclingPool::new(|| Vec::with_capacity(16 * 1024)));

fn handle_request(id: usize) -> usize {
    let mut buffer = BUFFERS.checkout();

    // The pool hands out buffers exactly as they were released.
    buffer.clear();
    buffer.extend_from_slice(format!("request {id}").as_bytes());

    buffer.len()
}

fn main() {
    let handles = (0..4)
        .map(|id| thread::spawn(move || handle_request(id)))
        .collect::<Vec<_>>();

    for handle in handles {
        let written = handle.join().unwrap();
        println!("handled request, wrote {written} bytes");
    }

    println!("{} buffers idle in the pool", BUFFERS.store().len());
}
