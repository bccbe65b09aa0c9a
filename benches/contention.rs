use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};

use hotelbook::catalog::{Hotel, HotelCatalog};
use hotelbook::ledger::Ledger;
use hotelbook::model::{ReservationRequest, DATE_FORMAT};
use hotelbook::notify::NotifyHub;

const HOTELS: usize = 10;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn hotel_id(i: usize) -> String {
    format!("bench-{i}")
}

fn night(base: NaiveDate, offset: u64, len: u64) -> ReservationRequest {
    let start = base + Days::new(offset);
    let end = start + Days::new(len);
    ReservationRequest::new(
        "bench",
        start.format(DATE_FORMAT).to_string(),
        end.format(DATE_FORMAT).to_string(),
    )
}

fn make_ledger() -> Arc<Ledger> {
    let hotels = (0..HOTELS)
        .map(|i| Hotel {
            id: hotel_id(i),
            ..Default::default()
        })
        .collect();
    Arc::new(Ledger::new(
        Arc::new(HotelCatalog::from_hotels(hotels)),
        Arc::new(NotifyHub::new()),
    ))
}

async fn phase1_sequential(base: NaiveDate) {
    let ledger = make_ledger();
    let n = 2000u64;
    let mut latencies = Vec::with_capacity(n as usize);
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        ledger
            .create_reservation(&hotel_id(0), night(base, i, 1))
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create latency (scan grows with hotel size)", &mut latencies);
}

async fn phase2_contended_creates(base: NaiveDate) {
    let ledger = make_ledger();
    let n_tasks = 16;
    let n_per_task = 200u64;
    let start = Instant::now();
    let mut handles = Vec::new();

    for t in 0..n_tasks {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            let hotel = hotel_id(t % HOTELS);
            let mut conflicts = 0u64;
            for j in 0..n_per_task {
                // Neighbouring tasks aim at the same nights to force conflicts.
                if ledger
                    .create_reservation(&hotel, night(base, j * 2 + (t as u64 % 2), 2))
                    .await
                    .is_err()
                {
                    conflicts += 1;
                }
            }
            conflicts
        }));
    }

    let mut conflicts = 0;
    for h in handles {
        conflicts += h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks as u64 * n_per_task;
    println!(
        "  {n_tasks} tasks x {n_per_task} creates = {total} attempts in {:.2}s, {conflicts} conflicts, {} stored",
        elapsed.as_secs_f64(),
        ledger.reservation_count().await
    );
}

async fn phase3_read_under_load(base: NaiveDate) {
    let ledger = make_ledger();
    for i in 0..500 {
        ledger
            .create_reservation(&hotel_id(1), night(base, i * 2, 1))
            .await
            .unwrap();
    }

    let writer = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            for i in 0..2000u64 {
                let _ = ledger
                    .create_reservation(&hotel_id(1), night(base, 1000 + i, 1))
                    .await;
            }
        })
    };

    let mut latencies = Vec::new();
    while !writer.is_finished() {
        let t = Instant::now();
        ledger.list_reservations(&hotel_id(1)).await.unwrap();
        latencies.push(t.elapsed());
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    print_latency("list latency during writes", &mut latencies);
}

#[tokio::main]
async fn main() {
    let base = NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid base date");

    println!("=== hotelbook ledger contention benchmark ===");

    println!("\n[phase 1] sequential create throughput");
    phase1_sequential(base).await;

    println!("\n[phase 2] contended creates across {HOTELS} hotels");
    phase2_contended_creates(base).await;

    println!("\n[phase 3] read latency under write load");
    phase3_read_under_load(base).await;

    println!("\n=== benchmark complete ===");
}
