//! Implicit conversions of host values: lists, callables, strings, enums
//! and converting constructors.

mod common;

use common::engine;
use templar::prelude::*;

#[test]
fn lists_fill_sequence_parameters() {
    let engine = engine(
        "double total(const std::vector<double>& values);
         int join(const std::vector<std::string>& parts);",
    );
    let ints = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let total = engine.resolve_call("", "total", &[], &[ints]).unwrap();
    assert_eq!(total.signature().map(|s| s.params.len()), Some(1));

    let strings = Value::List(vec![Value::str("a"), Value::str("b")]);
    assert!(engine.resolve_call("", "join", &[], &[strings]).is_ok());
    assert!(engine.resolve_call("", "join", &[], &[Value::List(Vec::new())]).is_ok());

    let mixed = Value::List(vec![Value::Int(1), Value::str("two")]);
    let err = engine.resolve_call("", "total", &[], &[mixed]).unwrap_err();
    assert!(matches!(err, ResolutionError::NoMatchingOverload { .. }), "{err}");
}

#[test]
fn callables_bind_to_function_objects() {
    let engine = engine(
        "namespace cb {
             typedef double (*binop)(double, double);
             std::vector<double> callback_vector(std::function<double(double)> f, const std::vector<double>& xs);
             double apply(binop f, double x, double y);
         }",
    );
    let unary = Value::Callable { arity: 1 };
    let xs = Value::List(vec![Value::Float(1.0), Value::Float(2.0)]);
    let mapped = engine.resolve_call("cb", "callback_vector", &[], &[unary.clone(), xs]).unwrap();
    assert_eq!(mapped.kind(), EntityKind::Function);

    let binary = Value::Callable { arity: 2 };
    let applied = engine
        .resolve_call("cb", "apply", &[], &[binary, Value::Float(1.0), Value::Float(2.0)])
        .unwrap();
    assert_eq!(applied.signature().map(|s| s.params.len()), Some(3));

    let err = engine
        .resolve_call("cb", "apply", &[], &[unary, Value::Float(1.0), Value::Float(2.0)])
        .unwrap_err();
    assert!(matches!(err, ResolutionError::NoMatchingOverload { .. }), "{err}");
}

#[test]
fn function_object_classes_take_signatures() {
    let engine = engine("");
    let function = engine
        .resolve_class("std::function", &[TemplateArg::from("double(std::vector<double>)")])
        .unwrap();
    assert_eq!(function.kind(), EntityKind::Class);
    assert!(function.qualified_name().starts_with("std::function<double("));
}

#[test]
fn strings_prefer_the_string_class() {
    let engine = engine(
        "int size_of(const char* text);
         int size_of(const std::string& text);
         int raw(const char* text);",
    );
    let chosen = engine.resolve_call("", "size_of", &[], &[Value::str("hello")]).unwrap();
    assert_eq!(chosen.signature_display(), "size_of(const std::string&)");

    // a C string still accepts host text when nothing better exists
    assert!(engine.resolve_call("", "raw", &[], &[Value::str("hello")]).is_ok());
}

#[test]
fn enumerators_match_their_enum_first() {
    let engine = engine(
        "namespace gfx {
             enum Color { Red, Green, Blue };
             enum class Mode { Fill, Line };
             int paint(Color c);
             int paint(int c);
             int fill(int m);
         }",
    );
    let green = engine.enumerator("gfx::Green").unwrap();
    let exact = engine.resolve_call("gfx", "paint", &[], &[green]).unwrap();
    assert_eq!(exact.signature_display(), "gfx::paint(gfx::Color)");

    let by_int = engine.resolve_call("gfx", "paint", &[], &[Value::Int(1)]).unwrap();
    assert_eq!(by_int.signature_display(), "gfx::paint(int)");

    // scoped enumerators never convert to integers
    let line = engine.enumerator("gfx::Mode::Line").unwrap();
    assert!(engine.resolve_call("gfx", "fill", &[], &[line]).is_err());
}

#[test]
fn converting_constructors_are_user_conversions() {
    let engine = engine(
        "namespace units {
             struct Meters { Meters(double v); };
             struct Grams { explicit Grams(double v); };
             double length(Meters m);
             double weight(Grams g);
             double either(Meters m);
             double either(long double v);
         }",
    );
    let length = engine.resolve_call("units", "length", &[], &[Value::Float(2.5)]).unwrap();
    assert_eq!(length.signature_display(), "units::length(units::Meters)");

    let err = engine.resolve_call("units", "weight", &[], &[Value::Float(2.5)]).unwrap_err();
    assert!(matches!(err, ResolutionError::NoMatchingOverload { .. }), "{err}");

    // a standard conversion beats the user-defined one
    let either = engine.resolve_call("units", "either", &[], &[Value::Float(2.5)]).unwrap();
    assert_eq!(either.signature_display(), "units::either(long double)");
}

#[test]
fn null_binds_to_any_pointer() {
    let engine = engine("struct Node; int visit(Node* node); int visit(int depth);");
    let null = engine.resolve_call("", "visit", &[], &[Value::Null]).unwrap();
    assert_eq!(null.signature_display(), "visit(Node*)");
    let depth = engine.resolve_call("", "visit", &[], &[Value::Int(3)]).unwrap();
    assert_eq!(depth.signature_display(), "visit(int)");
}

#[test]
fn instances_pass_as_base_pointers() {
    let engine = engine(
        "namespace l2v {
             struct Base {}; struct Derived : Base {};
             int single(Base* b);
             int test1(const std::vector<Base*>& v);
             template<typename T> int test2(const std::vector<Derived*>& v);
             template<typename T> int test2a(std::vector<Derived*> v);
             template<typename T> int test3(const std::vector<Base*>& v);
         }",
    );
    let d1 = Value::instance(engine.resolve_type("l2v::Derived").unwrap());
    assert!(engine.resolve_call("l2v", "single", &[], &[d1.clone()]).is_ok());

    let one = Value::List(vec![d1.clone()]);
    let two = Value::List(vec![d1.clone(), d1]);
    let int = [TemplateArg::from("int")];
    for list in [one, two] {
        assert!(engine.resolve_call("l2v", "test1", &[], &[list.clone()]).is_ok());
        for name in ["test2", "test2a", "test3"] {
            let entity = engine.resolve_call("l2v", name, &int, &[list.clone()]).unwrap();
            assert_eq!(entity.qualified_name(), format!("l2v::{name}<int>"));
        }
    }

    assert!(engine.resolve_call("l2v", "single", &[], &[Value::Int(1)]).is_err());
}

#[test]
fn enumerators_of_nested_enums() {
    let engine = engine(
        "namespace EnumConstructor {
             struct ST { enum TI { I32 }; };
             struct FS {
                 enum R { EQ, NE, GT, GE, LT, LE };
                 template<typename T> FS(const std::string&, const ST::TI, R, const T& e) {}
             };
         }",
    );
    let st = engine.enumerator("EnumConstructor::ST::I32").unwrap();
    assert_eq!(st, engine.enumerator("EnumConstructor::ST::TI::I32").unwrap());
    let eq = engine.enumerator("EnumConstructor::FS::EQ").unwrap();
    assert_eq!(eq, engine.enumerator("EnumConstructor::FS::R::EQ").unwrap());
    assert!(matches!(engine.enumerator("EnumConstructor::FS::LE").unwrap(), Value::Enumerator { value: 5, .. }));

    let args = [Value::str("i"), st, eq, Value::Int(10)];
    let ctor = engine.resolve_constructor("EnumConstructor::FS", &[], &args).unwrap();
    assert_eq!(ctor.kind(), EntityKind::Constructor);
    assert!(ctor.is_template_instance());
}
