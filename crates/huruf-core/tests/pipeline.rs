//! End-to-end behaviour of the scan/wrap pipeline over the in-memory document.

use huruf_core::script::contains_arabic;
use huruf_core::{
    Document, Dom, FONT_ATTR, FontKey, LocalTaskQueue, MemoryStore, ResolvedStyle, Runtime,
    ScriptMatcher, Settings, SettingsBridge, SettingsStore, is_marker,
};
use serde_json::{Map, Value, json};

type TestRuntime = Runtime<Document, LocalTaskQueue>;

fn runtime() -> TestRuntime {
    Runtime::new(Document::new(), Settings::default(), LocalTaskQueue::new())
}

fn body(runtime: &TestRuntime) -> huruf_core::NodeId {
    runtime.engine().dom().body().unwrap()
}

fn html(runtime: &TestRuntime) -> String {
    let engine = runtime.engine();
    engine.dom().inner_html(engine.dom().body().unwrap())
}

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

#[test]
fn scenario_mixed_latin_arabic_text() {
    let rt = runtime();
    let body = body(&rt);
    let original = rt
        .engine_mut()
        .dom_mut()
        .append_text(body, "Hello مرحبا 123 بالعالم!")
        .unwrap();
    rt.schedule_scan();
    rt.settle();

    let engine = rt.engine();
    let dom = engine.dom();
    // The replaced node is freed once the document settles.
    assert_eq!(dom.text(&original), None);
    let children = dom.children(body);
    assert_eq!(children.len(), 2, "no trailing text node when the run reaches the end");
    assert_eq!(dom.text(&children[0]).as_deref(), Some("Hello "));
    let marker = children[1];
    assert!(is_marker(dom, &marker));
    assert_eq!(dom.text_content(marker), "مرحبا 123 بالعالم!");
    assert_eq!(dom.style_property(marker, "font-size"), Some("1.3em"));
    assert_eq!(dom.style_property(marker, "line-height"), Some("1.9em"));
    assert_eq!(
        dom.style_property(marker, "font-family"),
        Some("'Droid Arabic Naskh', serif")
    );
    assert_eq!(
        dom.attribute(&marker, FONT_ATTR).as_deref(),
        Some("droid-arabic-naskh")
    );
}

#[test]
fn scenario_script_content_is_never_wrapped() {
    let rt = runtime();
    let body = body(&rt);
    {
        let mut engine = rt.engine_mut();
        let dom = engine.dom_mut();
        let script = dom.append_element(body, "script").unwrap();
        dom.append_text(script, "console.log('مرحبا')").unwrap();
    }
    assert!(ScriptMatcher::new().is_match("console.log('مرحبا')"));

    let before = html(&rt);
    rt.schedule_scan();
    rt.settle();
    assert_eq!(html(&rt), before);
    assert!(rt.engine().dom().markers().is_empty());
}

#[test]
fn rerunning_the_pipeline_changes_nothing() {
    let rt = runtime();
    let body = body(&rt);
    {
        let mut engine = rt.engine_mut();
        let dom = engine.dom_mut();
        let p = dom.append_element(body, "p").unwrap();
        dom.append_text(p, "قال: «نعم» then left, وعاد.").unwrap();
        let em = dom.append_element(p, "em").unwrap();
        dom.append_text(em, "كلمة").unwrap();
    }
    rt.watch();
    rt.schedule_scan();
    rt.settle();
    let once = html(&rt);
    let markers = rt.engine().dom().markers();

    for _ in 0..3 {
        rt.schedule_scan();
        rt.settle();
    }
    assert_eq!(html(&rt), once);
    assert_eq!(rt.engine().dom().markers(), markers);
}

#[test]
fn matches_are_maximal_runs() {
    let matcher = ScriptMatcher::new();
    let samples = [
        "Hello مرحبا 123 بالعالم!",
        "abc سلام، عليكم def",
        "١٢٣ رقم x ﻻ y",
        "(كتاب) and [قلم]",
        "no arabic here",
        "مرحبا\nبالعالم\tok",
    ];
    for text in samples {
        let runs = matcher.find_runs(text);
        // Every Arabic character belongs to some run.
        for (i, ch) in text.char_indices() {
            if contains_arabic(ch) {
                assert!(
                    runs.iter().any(|r| r.contains(&i)),
                    "{ch:?} at {i} not covered in {text:?}"
                );
            }
        }
        for run in &runs {
            let first = text[run.clone()].chars().next().unwrap();
            assert!(contains_arabic(first), "run must start on Arabic in {text:?}");
            // A run only stops at the end or at a non-Arabic letter.
            if let Some(next) = text[run.end..].chars().next() {
                assert!(next.is_alphabetic() && !contains_arabic(next), "{text:?}");
            }
        }
    }
}

#[test]
fn opted_out_and_marker_content_is_untouched() {
    let rt = runtime();
    let body = body(&rt);
    {
        let mut engine = rt.engine_mut();
        let dom = engine.dom_mut();
        let aside = dom.append_element(body, "aside").unwrap();
        dom.set_attribute(&aside, "data-huruf", "ignore").unwrap();
        let inner = dom.append_element(aside, "div").unwrap();
        dom.append_text(inner, "لا تلمس").unwrap();

        let existing = dom.append_element(body, "span").unwrap();
        dom.set_attribute(&existing, "class", "ar").unwrap();
        dom.set_attribute(&existing, "data-huruf", "1").unwrap();
        dom.append_text(existing, "موجود").unwrap();
    }
    let before = html(&rt);
    rt.schedule_scan();
    rt.settle();
    assert_eq!(html(&rt), before);
    assert_eq!(rt.engine().last_report().unwrap().skipped, 2);
}

#[test]
fn fifty_inserts_in_one_batch_scan_once() {
    let rt = runtime();
    rt.watch();
    let body = body(&rt);
    {
        let mut engine = rt.engine_mut();
        let dom = engine.dom_mut();
        for i in 0..50 {
            dom.append_text(body, &format!("سطر {i}")).unwrap();
        }
    }
    assert!(rt.flush_mutations());
    assert_eq!(rt.queue().len(), 1);
    assert_eq!(rt.engine().scheduler().coalesced(), 0);

    rt.queue().run_until_idle();
    assert_eq!(rt.engine().scans_run(), 1);
    assert_eq!(rt.engine().last_report().unwrap().wrapped, 50);
}

#[test]
fn mutations_while_scheduled_are_coalesced() {
    let rt = runtime();
    rt.watch();
    let body = body(&rt);
    for i in 0..5 {
        rt.engine_mut()
            .dom_mut()
            .append_text(body, &format!("دفعة {i}"))
            .unwrap();
        rt.flush_mutations();
    }
    assert_eq!(rt.queue().len(), 1);
    assert_eq!(rt.engine().scheduler().requested(), 5);
    assert_eq!(rt.engine().scheduler().coalesced(), 4);

    rt.settle();
    assert_eq!(rt.engine().dom().markers().len(), 5);
}

#[test]
fn character_data_edits_are_rescanned() {
    let rt = runtime();
    rt.watch();
    let body = body(&rt);
    let text = rt.engine_mut().dom_mut().append_text(body, "draft").unwrap();
    rt.settle();
    assert!(rt.engine().dom().markers().is_empty());

    rt.engine_mut().dom_mut().set_text(text, "draft مسودة").unwrap();
    rt.settle();
    assert_eq!(rt.engine().dom().markers().len(), 1);
}

#[test]
fn non_finite_settings_style_markers_with_defaults() {
    let rt = runtime();
    let body = body(&rt);
    rt.engine_mut().dom_mut().append_text(body, "نص").unwrap();
    rt.apply_settings(Settings {
        text_size: f64::NAN,
        line_height: f64::INFINITY,
        font: FontKey::Lateef,
    });
    rt.settle();

    let engine = rt.engine();
    let dom = engine.dom();
    let markers = dom.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(dom.style_property(markers[0], "font-size"), Some("1.3em"));
    assert_eq!(dom.style_property(markers[0], "line-height"), Some("1.9em"));
}

#[test]
fn settings_round_trip() {
    let style = ResolvedStyle::resolve(&Settings::from_record(&record(json!({
        "textSize": 150, "lineHeight": 200, "fontKey": "amiri"
    }))));
    assert_eq!(style.font_size_ratio, 1.5);
    assert_eq!(style.line_height_ratio, 2.0);
    assert_eq!(style.font_family_stack, FontKey::Amiri.stack());

    let fallback = ResolvedStyle::resolve(&Settings::from_record(&record(json!({
        "fontKey": "xyz"
    }))));
    assert_eq!(fallback.font_family_stack, "'Droid Arabic Naskh', serif");
}

#[tokio::test]
async fn store_changes_restyle_in_place_and_rescan() {
    let store = MemoryStore::new();
    let rt = runtime();
    let body = body(&rt);
    rt.engine_mut()
        .dom_mut()
        .append_text(body, "أول first ثاني")
        .unwrap();

    let bridge = SettingsBridge::new(store.clone(), rt.clone());
    {
        let bridge = bridge.clone();
        store.on_changed(move |area, changes| {
            bridge.on_changed(area, changes);
        });
    }
    bridge
        .start(|rt| {
            rt.watch();
        })
        .await;
    rt.settle();
    let markers = rt.engine().dom().markers();
    assert_eq!(markers.len(), 2);

    // Text that arrives while the old settings are current...
    rt.engine_mut().dom_mut().append_text(body, " جديد").unwrap();
    // ...and a font change before the page's mutations are delivered.
    store
        .set(&record(json!({ "fontKey": "scheherazade-new" })))
        .await
        .unwrap();
    rt.settle();

    let engine = rt.engine();
    let dom = engine.dom();
    let now = dom.markers();
    assert_eq!(now.len(), 3);
    assert_eq!(&now[..2], &markers[..]);
    for marker in &now {
        assert_eq!(
            dom.attribute(marker, FONT_ATTR).as_deref(),
            Some("scheherazade-new")
        );
        assert_eq!(
            dom.style_property(*marker, "font-family"),
            Some(FontKey::ScheherazadeNew.stack())
        );
    }
}
