//! Simple decoder to inspect storyboard documents.
//!
//! ```text
//! RUST_LOG=debug cargo run --example inspect_document -- path/to/document.json
//! ```

use std::fs;

use storyboard::model::{Document, NodeIndex, NodeKind};
use storyboard::{DecodeOptions, decode_document_with_options};

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Screen(screen) => format!("\"{}\"", screen.title.as_deref().unwrap_or("")),
        NodeKind::Text(text) => {
            let preview: String = text.text.constant.chars().take(40).collect();
            let bound = if text.text.is_bound() { " (bound)" } else { "" };
            format!("\"{preview}\"{bound}")
        }
        NodeKind::Stack(stack) => format!("{:?}, spacing {}", stack.axis, stack.spacing),
        NodeKind::Collection(collection) => format!(
            "{} ({} filter(s), {} sort key(s))",
            collection.key_path,
            collection.filters.len(),
            collection.sort_descriptors.len()
        ),
        NodeKind::Conditional(conditional) => format!("{} condition(s)", conditional.conditions.len()),
        NodeKind::MainComponent(main) => format!(
            "{} propert(ies), {} instance(s)",
            main.properties.len(),
            main.instances().len()
        ),
        NodeKind::ComponentInstance(instance) => format!("{} override(s)", instance.overrides.len()),
        _ => String::new(),
    }
}

fn print_tree(doc: &Document, index: NodeIndex, depth: usize) {
    let Some(node) = doc.graph.get(index) else {
        return;
    };
    let name = node.name.as_deref().map(|n| format!(" {n}")).unwrap_or_default();
    println!(
        "{:indent$}{}{name} [{}] {}",
        "",
        node.type_name(),
        node.id(),
        describe(&node.kind),
        indent = depth * 2
    );
    for child in node.children() {
        print_tree(doc, *child, depth + 1);
    }
}

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "document.json".to_string());

    println!("Reading: {path}");

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let (doc, report) =
        decode_document_with_options(&data, &DecodeOptions::default()).expect("Failed to decode");

    println!("\n=== Document Info ===");
    println!(
        "Version: {} (compatibility {})",
        doc.meta.version, doc.meta.compatibility_version
    );
    if let Some(app_version) = &doc.meta.app_version {
        println!("App version: {app_version}");
    }
    println!("Nodes: {}", doc.graph.len());
    println!("Colors: {}, gradients: {}, fonts: {}", doc.colors.len(), doc.gradients.len(), doc.fonts.len());
    println!("Segues: {}", doc.segues.len());
    println!("Links resolved: {}", report.resolved);

    if !report.is_clean() {
        println!("\n=== Integrity Faults ({}) ===", report.faults.len());
        for fault in &report.faults {
            println!("  - {fault}");
        }
    }

    println!("\n=== Screens ({}) ===", doc.screens.len());
    for screen in &doc.screens {
        let marker = if doc.initial_screen == Some(*screen) { "*" } else { " " };
        print!("{marker} ");
        print_tree(&doc, *screen, 0);
    }
}
