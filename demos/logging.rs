//! Example showing the events of one processing run
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use bean_processor::names;
use bean_processor::prelude::*;
use std::sync::Arc;

fn marker(name: &DotName) -> AnnotationInstance {
    AnnotationInstance::marker(name.clone())
}

fn classes() -> Vec<ClassInfo> {
    vec![
        ClassInfo::builder("org.acme.Database")
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .build(),
        ClassInfo::builder("org.acme.UserService")
            .no_args_constructor()
            .annotation(marker(&names::APPLICATION_SCOPED))
            .field(FieldInfo::new("database", Type::class("org.acme.Database")).annotation(marker(&names::INJECT)))
            .build(),
        // never injected, removed below
        ClassInfo::builder("org.acme.Unused")
            .no_args_constructor()
            .annotation(marker(&names::DEPENDENT))
            .build(),
    ]
}

fn main() {
    // JSON if logging-json is enabled, pretty otherwise
    bean_processor::logging::builder().trace().processor_only().init();

    println!("=== Bean Processor Logging Demo ===\n");

    let output = Arc::new(InMemoryOutput::new());
    let processor = BeanProcessor::builder()
        .name("demo")
        .index(Index::from_classes(classes()))
        .output(output.clone())
        .remove_unused_beans(true)
        .build();

    match processor.process() {
        Ok(result) => {
            println!("\nRemoved {} unused bean(s)", result.removed().len());
            println!("Generated resources:");
            for name in result.resources() {
                println!("  {name}");
            }
        }
        Err(error) => eprintln!("Deployment failed: {error}"),
    }

    // An unsatisfied dependency fails the whole run
    let broken = ClassInfo::builder("org.acme.Broken")
        .no_args_constructor()
        .annotation(marker(&names::SINGLETON))
        .field(FieldInfo::new("missing", Type::class("org.acme.Missing")).annotation(marker(&names::INJECT)))
        .build();
    let failed = BeanProcessor::builder()
        .index(Index::from_classes(vec![broken]))
        .build()
        .process();
    if let Err(error) = failed {
        println!("\nExpected failure:\n{error}");
    }

    println!("\n=== Demo Complete ===");
}
