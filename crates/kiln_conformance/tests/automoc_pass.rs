//! End-to-end behavior of the automoc pass over real files scanned by the
//! built-in C++ scanner.

use std::collections::BTreeMap;

use kiln_automoc::AutomocTags;
use kiln_common::FileTime;
use kiln_conformance::{automoc, builtin_registry, TestProject};
use kiln_graph::ArtifactId;

const WIDGET: &str = "#include <QObject>\n\nclass Widget : public QObject {\n    Q_OBJECT\npublic:\n    Widget();\n};\n";
const PLAIN_WIDGET: &str = "#include <QObject>\n\nclass Widget : public QObject {\npublic:\n    Widget();\n};\n";

fn at(nanos: u64) -> FileTime {
    FileTime::from_nanos(nanos)
}

#[test]
fn widget_header_gains_and_loses_companion() {
    let mut p = TestProject::new();
    let header = p.write("widget.hpp", WIDGET, &["hpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();

    let companion = p.generated("moc_widget.cpp").expect("companion exists");
    let object = p.generated("moc_widget.o").expect("object exists");
    assert_eq!(p.tags_of(companion), vec!["cpp"]);
    assert!(p.is_connected(companion, header));
    assert!(p.is_connected(object, companion));
    assert!(p.tags_of(header).contains(&"moc_hpp".to_string()));

    p.write("widget.hpp", PLAIN_WIDGET, &["hpp"], 20);
    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(30)).unwrap();

    assert!(p.generated("moc_widget.cpp").is_none());
    assert!(p.generated("moc_widget.o").is_none());
    assert!(!p.graph.contains(companion));
    assert!(!p.graph.contains(object));
    assert_eq!(report.retracted, vec![p.out("moc_widget.o"), p.out("moc_widget.cpp")]);
    assert!(p.graph.get(header).unwrap().parents().is_empty());
    assert_eq!(p.tags_of(header), vec!["hpp"]);
}

#[test]
fn repeated_pass_is_a_no_op() {
    let mut p = TestProject::new();
    p.write("widget.hpp", WIDGET, &["hpp"], 1);
    p.write("main.cpp", "#include \"widget.hpp\"\nint main() {}\n", &["cpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();
    let len = p.graph.len();
    let header = p.graph.find(&p.path("widget.hpp")).unwrap();
    let tags = p.tags_of(header);

    let unchanged = pass.apply_at(&mut p.graph, p.product, &mut rules, at(20)).unwrap();
    assert!(unchanged.scanned.is_empty());
    assert!(unchanged.batch.is_empty());
    assert_eq!(p.graph.len(), len);

    // Touched but with the same content: rescanned, still no structural change.
    p.write("widget.hpp", WIDGET, &["hpp"], 25);
    let touched = pass.apply_at(&mut p.graph, p.product, &mut rules, at(30)).unwrap();
    assert_eq!(touched.scanned, vec![header]);
    assert!(touched.batch.is_empty());
    assert!(touched.retracted.is_empty());
    assert_eq!(p.graph.len(), len);
    assert_eq!(p.tags_of(header), tags);
}

#[test]
fn every_artifact_lands_in_exactly_one_batch_entry() {
    let mut p = TestProject::new();
    let standalone = p.write("a.hpp", "class A { Q_OBJECT };\n", &["hpp"], 1);
    let included = p.write("b.hpp", "class B { Q_GADGET };\n", &["hpp"], 1);
    let unit = p.write("c.cpp", "class C { Q_OBJECT };\n#include \"c.moc\"\n", &["cpp"], 1);
    let plugin = p.write(
        "p.hpp",
        "class P { Q_OBJECT\n Q_PLUGIN_METADATA(IID \"org.kiln.P\" FILE \"p.json\") };\n",
        &["hpp"],
        1,
    );
    p.write("main.cpp", "#include \"moc_b.cpp\"\nint main() {}\n", &["cpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();

    let mut seen: BTreeMap<ArtifactId, usize> = BTreeMap::new();
    for id in report.batch.values().flatten() {
        *seen.entry(*id).or_default() += 1;
    }
    assert_eq!(seen.len(), 4);
    assert!(seen.values().all(|&n| n == 1));

    let tags = AutomocTags::new(p.graph.interner());
    assert!(report.batch[&tags.moc_hpp].contains(&standalone));
    assert!(report.batch[&tags.moc_hpp].contains(&plugin));
    assert!(report.batch[&tags.moc_hpp_inc].contains(&included));
    assert!(report.batch[&tags.moc_cpp].contains(&unit));
}

#[test]
fn included_companion_switches_to_inclusion_style() {
    let mut p = TestProject::new();
    let header = p.write("widget.hpp", WIDGET, &["hpp"], 1);
    p.write("widget.cpp", "#include \"widget.hpp\"\n#include \"moc_widget.cpp\"\n", &["cpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();

    let tag_names = p.tags_of(header);
    assert!(tag_names.contains(&"moc_hpp_inc".to_string()));
    assert!(!tag_names.contains(&"moc_hpp".to_string()));
    let companion = p.generated("moc_widget.cpp").unwrap();
    assert_eq!(p.tags_of(companion), vec!["hpp"]);
    assert!(p.generated("moc_widget.o").is_none());
}

#[test]
fn include_with_directory_does_not_match() {
    let mut p = TestProject::new();
    let header = p.write("widget.hpp", WIDGET, &["hpp"], 1);
    p.write("widget.cpp", "#include \"gen/moc_widget.cpp\"\n", &["cpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();

    assert!(p.tags_of(header).contains(&"moc_hpp".to_string()));
    assert!(p.generated("moc_widget.o").is_some());
}

#[test]
fn plugin_header_consumers_depend_on_metadata() {
    let mut p = TestProject::new();
    let header = p.write(
        "plugin.hpp",
        "class Plugin : public QObject {\n    Q_OBJECT\n    Q_PLUGIN_METADATA(IID \"org.kiln.Plugin\" FILE \"plugin.json\")\n};\n",
        &["hpp"],
        1,
    );
    let metadata = p.write("plugin.json", "{}\n", &["qt_plugin_metadata"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();

    assert_eq!(report.plugin_header, Some(header));
    let tag_names = p.tags_of(header);
    assert!(tag_names.contains(&"moc_hpp".to_string()));
    assert!(!tag_names.contains(&"moc_plugin_hpp".to_string()));

    let companion = p.generated("moc_plugin.cpp").unwrap();
    assert!(p.is_connected(companion, header));
    assert!(p.is_connected(companion, metadata));
}

#[test]
fn plugin_header_without_metadata_gets_no_extra_edges() {
    let mut p = TestProject::new();
    p.write(
        "plugin.hpp",
        "class Plugin { Q_OBJECT Q_PLUGIN_METADATA(IID \"x\") };\n",
        &["hpp"],
        1,
    );
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();

    assert!(report.plugin_header.is_some());
    let companion = p.generated("moc_plugin.cpp").unwrap();
    assert_eq!(p.graph.get(companion).unwrap().children().len(), 1);
}

#[test]
fn source_companion_is_retracted() {
    let mut p = TestProject::new();
    let unit = p.write("main.cpp", "class L { Q_OBJECT };\n#include \"main.moc\"\n", &["cpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();
    let companion = p.generated("main.moc").unwrap();
    assert!(p.is_connected(companion, unit));

    p.write("main.cpp", "int main() {}\n", &["cpp"], 20);
    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(30)).unwrap();

    assert!(p.generated("main.moc").is_none());
    assert_eq!(report.retracted, vec![p.out("main.moc")]);
    assert_eq!(p.tags_of(unit), vec!["cpp"]);
}

#[test]
fn macro_can_come_back_after_retraction() {
    let mut p = TestProject::new();
    p.write("widget.hpp", WIDGET, &["hpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();
    p.write("widget.hpp", PLAIN_WIDGET, &["hpp"], 20);
    pass.apply_at(&mut p.graph, p.product, &mut rules, at(30)).unwrap();
    assert!(p.generated("moc_widget.cpp").is_none());

    p.write("widget.hpp", WIDGET, &["hpp"], 40);
    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(50)).unwrap();

    assert!(!report.batch.is_empty());
    assert!(p.generated("moc_widget.cpp").is_some());
    assert!(p.generated("moc_widget.o").is_some());
}

#[test]
fn missing_companion_leaves_consumers_alone() {
    let mut p = TestProject::new();
    let header = p.write("widget.hpp", WIDGET, &["hpp"], 1);
    let unit = p.write("main.cpp", "#include \"widget.hpp\"\nint main() {}\n", &["cpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();
    p.graph.connect(unit, header).unwrap();
    let companion = p.generated("moc_widget.cpp").unwrap();
    let object = p.generated("moc_widget.o").unwrap();
    p.graph.remove_artifact(object).unwrap();
    p.graph.remove_artifact(companion).unwrap();

    p.write("widget.hpp", PLAIN_WIDGET, &["hpp"], 20);
    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(30)).unwrap();

    assert!(report.retracted.is_empty());
    assert!(p.graph.contains(unit));
    assert!(p.is_connected(unit, header));
    assert_eq!(p.tags_of(header), vec!["hpp"]);
}

#[test]
fn missing_object_still_retracts_companion() {
    let mut p = TestProject::new();
    let header = p.write("widget.hpp", WIDGET, &["hpp"], 1);
    let pass = automoc(builtin_registry());
    let mut rules = p.rules();

    pass.apply_at(&mut p.graph, p.product, &mut rules, at(10)).unwrap();
    let object = p.generated("moc_widget.o").unwrap();
    p.graph.remove_artifact(object).unwrap();

    p.write("widget.hpp", PLAIN_WIDGET, &["hpp"], 20);
    let report = pass.apply_at(&mut p.graph, p.product, &mut rules, at(30)).unwrap();

    assert_eq!(report.retracted, vec![p.out("moc_widget.cpp")]);
    assert!(p.generated("moc_widget.cpp").is_none());
    assert!(p.graph.contains(header));
    assert_eq!(p.tags_of(header), vec!["hpp"]);
}
