#![no_main]

use libfuzzer_sys::fuzz_target;
use navig::{Environment, ExprEvaluator, Heap, PredicateEvaluator, Slot, Value};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4 * 1024 {
        return;
    }
    let text = String::from_utf8_lossy(data);
    let _ = navig::parse_predicate(&text);

    let mut env = Environment::new(Heap::new());
    env.insert("n", Slot::Value(Value::number(1.0)));
    env.insert("o", Slot::Value(Value::reference(1)));
    let _ = ExprEvaluator::new().evaluate(&text, &env);
});
