//! Tests for the IntoProps derive macro
//!
//! These tests verify that derived records turn into props and can be
//! spread into templates.

#![cfg(feature = "derive")]

use async_htm::{html, render_to_string, IntoProps, Props, Value};
use pretty_assertions::assert_eq;

#[derive(IntoProps)]
struct Link {
    href: String,
    #[props(rename = "aria-label")]
    label: Option<String>,
    #[props(skip)]
    #[allow(dead_code)]
    visits: u64,
    hidden: bool,
}

#[derive(IntoProps)]
struct Cell<T: Into<Value>> {
    colspan: T,
}

fn link(label: Option<&str>) -> Link {
    Link {
        href: "/docs".to_string(),
        label: label.map(str::to_string),
        visits: 42,
        hidden: false,
    }
}

#[test]
fn test_fields_become_props_in_order() {
    let props = link(Some("Docs")).into_props();
    let names: Vec<&str> = props.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["href", "aria-label", "hidden"]);
    assert_eq!(props["href"], Value::from("/docs"));
    assert_eq!(props["aria-label"], Value::from("Docs"));
    assert_eq!(props["hidden"], Value::from(false));
}

#[test]
fn test_none_becomes_undefined() {
    let props = link(None).into_props();
    assert_eq!(props.get("aria-label"), Some(&Value::Undefined));
}

#[test]
fn test_record_converts_to_object() {
    let value = Value::from(link(None));
    let expected: Props = link(None).into_props();
    assert_eq!(value, Value::Object(expected));
}

#[test]
fn test_generic_record() {
    let props = Cell { colspan: 2 }.into_props();
    assert_eq!(props["colspan"], Value::from(2));
}

#[tokio::test]
async fn test_record_spreads_into_template() {
    let anchor = html!(["<a ...", ">read more</a>"], link(Some("Read the docs"))).unwrap();
    assert_eq!(
        render_to_string(anchor).await.unwrap(),
        "<a href=\"/docs\" aria-label=\"Read the docs\">read more</a>"
    );
}
