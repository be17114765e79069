//! Simple example usage of [`fold_reduce::FoldReducer`].

use fold_reduce::FoldReducer;
use std::thread;

// Define your operation type, e.g.:
type Op = i64;

// Define your state type.
type State = i64;

// Define your fold operation.
fn fold(state: &mut State, op: Op) {
    *state += op;
}

// Define your reduction of two partial states.
fn reduce(s1: State, s2: State) -> State {
    s1 + s2
}

fn main() {
    let reducer = FoldReducer::new(|| 0, fold, reduce);

    // Fold from the main thread if desired.
    reducer.fold(1).unwrap();

    thread::scope(|s| {
        for i in 0..4 {
            let reducer = &reducer;
            s.spawn(move || {
                for j in 1..=100 {
                    reducer.fold(i * 1000 + j).unwrap();
                }
            });
        }

        // Snapshots may be taken at any time, even while other threads are folding.
        let snapshot = reducer.get_state().unwrap();
        println!("intermediate snapshot: {snapshot}");
    });

    let total = reducer.get_state().unwrap();
    println!("total={total}");
    assert_eq!(total, 1 + 4 * 5050 + 1000 * 100 * (1 + 2 + 3));

    // Flush the window and start a new one.
    let window = reducer.reset_state().unwrap();
    assert_eq!(window, total);
    assert_eq!(reducer.get_state().unwrap(), 0);
}
