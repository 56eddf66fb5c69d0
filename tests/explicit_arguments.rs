//! Explicit template arguments: `name[args]()` from the host.

mod common;

use std::sync::Arc;

use common::engine;
use templar::prelude::*;

const METHOD_CLASS: &str = "
    class MyTemplatedMethodClass {
    public:
        template<class B> long get_size();
        template<class B> long get_size(const B& b);
        long get_size(double d);
        long get_char_size();
    };
    typedef MyTemplatedMethodClass MyTMCTypedef_t;
";

#[test]
fn explicit_member_template_is_deterministic() {
    let engine = engine(METHOD_CLASS);
    let scope = "MyTemplatedMethodClass";

    // an untyped call first; it must not disturb the explicit lookup
    let untyped = engine.resolve_call(scope, "get_size", &[], &[Value::Float(3.14)]).unwrap();
    assert!(!untyped.is_template_instance());
    assert_eq!(untyped.signature_display(), "MyTemplatedMethodClass::get_size(double)");

    let explicit = engine
        .resolve_call(scope, "get_size", &[TemplateArg::from("double")], &[])
        .unwrap();
    assert_eq!(explicit.qualified_name(), "MyTemplatedMethodClass::get_size<double>");
    assert_eq!(explicit.signature().map(|s| s.params.len()), Some(0));

    let again = engine.resolve_call(scope, "get_size<double>", &[], &[]).unwrap();
    assert!(Arc::ptr_eq(&explicit, &again));
    assert_eq!(engine.instantiator().count("MyTemplatedMethodClass::get_size<double>"), 1);
}

#[test]
fn typedef_arguments_share_the_canonical_instance() {
    let engine = engine(METHOD_CLASS);
    let scope = "MyTemplatedMethodClass";
    let via_typedef = engine
        .resolve_call(scope, "get_size", &[TemplateArg::from("MyTMCTypedef_t")], &[])
        .unwrap();
    let direct = engine
        .resolve_call(scope, "get_size", &[TemplateArg::from("MyTemplatedMethodClass")], &[])
        .unwrap();
    assert!(Arc::ptr_eq(&via_typedef, &direct));
    assert_eq!(via_typedef.key().canonical_name(), "MyTemplatedMethodClass::get_size<MyTemplatedMethodClass>");

    // the first spelling names the entity
    assert_eq!(engine.exposed_names(scope), vec!["get_size<MyTMCTypedef_t>"]);
}

#[test]
fn non_type_arguments() {
    let engine = engine("template<int i> int nt_templ_args();");
    let one = engine.resolve_call("", "nt_templ_args", &[TemplateArg::Int(1)], &[]).unwrap();
    let big = engine.resolve_call("", "nt_templ_args", &[TemplateArg::Int(256)], &[]).unwrap();
    assert_eq!(one.qualified_name(), "nt_templ_args<1>");
    assert_eq!(big.qualified_name(), "nt_templ_args<256>");
    assert!(!Arc::ptr_eq(&one, &big));
}

#[test]
fn explicit_pack_of_three() {
    let engine = engine("template<typename... myTypes> int test04_variadic_func();");
    let args = [TemplateArg::from("int"), TemplateArg::from("double"), TemplateArg::from("void*")];
    let entity = engine.resolve_call("", "test04_variadic_func", &args, &[]).unwrap();
    assert_eq!(entity.qualified_name(), "test04_variadic_func<int,double,void*>");

    let joined = engine
        .resolve_call("", "test04_variadic_func", &[TemplateArg::from("int, double, void*")], &[])
        .unwrap();
    assert!(Arc::ptr_eq(&entity, &joined));
}

#[test]
fn parameters_after_a_pack() {
    let engine = engine(
        "namespace partial_template {
             template <typename A, typename... Other, typename B>
             B bar1(B b) { return b; }
         }
         template<class A, class... B, class C> void odd();",
    );
    let ns = "partial_template";
    let both = engine
        .resolve_call(ns, "bar1", &[TemplateArg::from("double"), TemplateArg::from("int")], &[Value::Int(17)])
        .unwrap();
    let deduced = engine
        .resolve_call(ns, "bar1", &[TemplateArg::from("double")], &[Value::Int(17)])
        .unwrap();
    assert!(Arc::ptr_eq(&both, &deduced));
    assert_eq!(both.qualified_name(), "partial_template::bar1<double,int>");
    assert_eq!(both.result_type(), Some(&engine.resolve_type("int").unwrap()));

    let err = engine.resolve_call("", "odd", &[TemplateArg::from("int")], &[]).unwrap_err();
    assert!(matches!(err, ResolutionError::UnderspecifiedTemplate { .. }));
    let empty_pack = engine
        .resolve_call("", "odd", &[TemplateArg::from("int"), TemplateArg::from("char")], &[])
        .unwrap();
    assert_eq!(empty_pack.qualified_name(), "odd<int,char>");
}

#[test]
fn explicit_completion_from_call_arguments() {
    const SOURCE: &str = "template<class A, class... Other, class B> int stamp(int n);";

    let engine = engine(SOURCE);
    let completed = engine
        .resolve_call("", "stamp", &[TemplateArg::from("double")], &[Value::Int(17)])
        .unwrap();
    assert_eq!(completed.qualified_name(), "stamp<double,int>");

    let strict = Engine::with_config(EngineConfig::default().with_explicit_completion(false), NullInstantiator).unwrap();
    strict.register_source(SOURCE).unwrap();
    let err = strict
        .resolve_call("", "stamp", &[TemplateArg::from("double")], &[Value::Int(17)])
        .unwrap_err();
    assert!(matches!(err, ResolutionError::UnderspecifiedTemplate { .. }));
}

#[test]
fn bad_tokens_are_reported() {
    let engine = engine("template<class T> int get_size();");
    let err = engine
        .resolve_call("", "get_size", &[TemplateArg::from("NoSuchClass")], &[])
        .unwrap_err();
    assert!(matches!(err, ResolutionError::UnresolvableArgument { token } if token == "NoSuchClass"));

    let err = engine
        .resolve_call("", "get_size", &[TemplateArg::from("int"), TemplateArg::from("int")], &[])
        .unwrap_err();
    assert!(matches!(err, ResolutionError::ArgumentCountMismatch { .. }));
}
