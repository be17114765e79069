//! Times units of work on several threads and reports windows of aggregated timings.

use fold_reduce::pm::{pm_reducer, report_window, Pm};
use std::{thread, time::Duration};

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let reducer = pm_reducer();

    for window in 0..3 {
        thread::scope(|s| {
            for t in 0..4u64 {
                let reducer = &reducer;
                s.spawn(move || {
                    for _ in 0..10 {
                        let pm = Pm::start("sleep");
                        thread::sleep(Duration::from_micros(100 * (t + 1)));
                        pm.log(reducer);
                    }
                });
            }
        });

        let table = report_window(&reducer);
        println!("window {window}: {table:?}");
    }
}
