//! Class templates: specializations, hiding, aliases, members of instances.

mod common;

use std::sync::Arc;

use common::engine;
use templar::prelude::*;

#[test]
fn most_specific_specialization_wins() {
    let engine = engine(
        "template<typename T, typename U> struct S { int primary(); };
         template<typename T> struct S<T, int> { int partial(); };
         template<> struct S<int, int> { int full(); };
         template<class T, class U> struct Amb {};
         template<class T> struct Amb<T, int> {};
         template<class U> struct Amb<int, U> {};",
    );
    let member = |spelling: &str, name: &str| engine.has_member(&engine.resolve_type(spelling).unwrap(), name);
    assert!(member("S<double,double>", "primary"));
    assert!(member("S<double,int>", "partial"));
    assert!(member("S<int,int>", "full"));
    assert!(!member("S<int,int>", "primary"));

    let full = engine.resolve_class("S<int,int>", &[]).unwrap();
    assert!(full.declaration().is_specialization());
    assert_eq!(full.kind(), EntityKind::Class);

    let err = engine.resolve_class("Amb<int,int>", &[]).unwrap_err();
    assert!(matches!(err, ResolutionError::AmbiguousSpecialization { candidates, .. } if candidates.len() == 2));
    assert!(engine.resolve_class("Amb<int,double>", &[]).is_ok());
}

const HIDING: &str = "
    namespace TemplateHiding {
        struct Base {
            int callme(int x);
            template<class T> int callme(T x, T y);
        };
        struct Derived : public Base {
            int callme();
        };
        struct Exposing : public Base {
            using Base::callme;
            int callme();
        };
    }
";

#[test]
fn derived_names_hide_base_overloads() {
    let engine = engine(HIDING);
    let derived = "TemplateHiding::Derived";
    let own = engine.resolve_call(derived, "callme", &[], &[]).unwrap();
    assert_eq!(own.signature_display(), "TemplateHiding::Derived::callme()");
    assert!(engine.resolve_call(derived, "callme", &[], &[Value::Int(2)]).is_err());

    let base = engine.resolve_call("TemplateHiding::Base", "callme", &[], &[Value::Int(1)]).unwrap();
    assert_eq!(base.signature().map(|s| s.params.len()), Some(1));
}

#[test]
fn using_declarations_reopen_base_overloads() {
    let engine = engine(HIDING);
    let exposing = "TemplateHiding::Exposing";
    let own = engine.resolve_call(exposing, "callme", &[], &[]).unwrap();
    assert_eq!(own.signature().map(|s| s.params.len()), Some(0));
    let inherited = engine.resolve_call(exposing, "callme", &[], &[Value::Int(2)]).unwrap();
    assert_eq!(inherited.signature().map(|s| s.params.len()), Some(1));
    let generic = engine
        .resolve_call(exposing, "callme", &[], &[Value::Float(1.0), Value::Float(2.0)])
        .unwrap();
    assert!(generic.is_template_instance());
}

#[test]
fn alias_templates_are_transparent() {
    let engine = engine(
        "template<typename T> using IA_vector = std::vector<T>;
         typedef std::vector<int> int_vector;",
    );
    let via_alias = engine.resolve_class("IA_vector<float>", &[]).unwrap();
    let direct = engine.resolve_class("std::vector<float>", &[]).unwrap();
    assert!(Arc::ptr_eq(&via_alias, &direct));

    let explicit = engine.resolve_class("IA_vector", &[TemplateArg::from("float")]).unwrap();
    assert!(Arc::ptr_eq(&explicit, &direct));

    assert_eq!(
        engine.resolve_type("int_vector").unwrap(),
        engine.resolve_type("std::vector<int>").unwrap()
    );
}

#[test]
fn member_aliases_resolve_per_instance() {
    let engine = engine(
        "template<class T> struct Holder {
             typedef T value_type;
             value_type get() const;
         };",
    );
    let int = engine.resolve_type("int").unwrap();
    let double = engine.resolve_type("double").unwrap();
    assert_eq!(engine.resolve_type("Holder<double>::value_type").unwrap(), double);

    let get = engine.resolve_call("Holder<int>", "get", &[], &[]).unwrap();
    assert_eq!(get.result_type(), Some(&int));
    assert_eq!(get.kind(), EntityKind::Method);
}

#[test]
fn static_data_through_using() {
    let engine = engine(
        "template<class T> struct BaseClassWithStatic {
             static const T ref_value;
         };
         template<class T> struct DerivedClassUsingStatic : public BaseClassWithStatic<T> {
             using BaseClassWithStatic<T>::ref_value;
             DerivedClassUsingStatic(T x);
         };",
    );
    let base = engine.resolve_call("BaseClassWithStatic<size_t>", "ref_value", &[], &[]).unwrap();
    assert_eq!(base.kind(), EntityKind::Variable);
    let through_using = engine.resolve_call("DerivedClassUsingStatic<size_t>", "ref_value", &[], &[]).unwrap();
    assert_eq!(through_using.kind(), EntityKind::Variable);
    assert!(through_using.ty().is_some_and(|ty| ty.is_const()));

    let ctor = engine
        .resolve_constructor("DerivedClassUsingStatic<size_t>", &[], &[Value::Int(100)])
        .unwrap();
    assert_eq!(ctor.kind(), EntityKind::Constructor);
}

const VARIADIC: &str = "
    namespace some_variadic {
        template<typename T, typename U>
        class A {
        public:
            A();
            template<typename... Args> static void sa(Args&&... args);
            template<typename R, typename... Args> static R sa_T(Args&&... args);
            template<typename... Args> void a(Args&&... args);
        };

        class B {
        public:
            template<typename... Args> static void sb(Args&&... args);
        };
    }
";

#[test]
fn forwarding_packs_in_class_templates() {
    let engine = engine(VARIADIC);
    let args = [Value::Int(1), Value::Float(1.0), Value::str("a")];

    let class = engine.resolve_class("some_variadic::A", &[TemplateArg::from("int"), TemplateArg::from("double")]).unwrap();
    assert_eq!(class.qualified_name(), "some_variadic::A<int,double>");

    let sa = engine.resolve_call("some_variadic::A<int,double>", "sa", &[], &args).unwrap();
    assert_eq!(sa.kind(), EntityKind::StaticMethod);
    assert_eq!(
        sa.signature_display(),
        "some_variadic::A<int,double>::sa<int,double,std::string>(int&&,double&&,std::string&&)"
    );

    let other = engine.resolve_call("some_variadic::A<char&,double*>", "sa", &[], &args).unwrap();
    assert_eq!(
        other.signature_display(),
        "some_variadic::A<char&,double*>::sa<int,double,std::string>(int&&,double&&,std::string&&)"
    );

    let typed = engine
        .resolve_call("some_variadic::A<int,double>", "sa_T", &[TemplateArg::from("int")], &args)
        .unwrap();
    assert_eq!(typed.result_type(), Some(&engine.resolve_type("int").unwrap()));

    let member = engine.resolve_call("some_variadic::A<int,double>", "a", &[], &args).unwrap();
    assert_eq!(member.kind(), EntityKind::Method);
    assert_eq!(member.owner().map(ToString::to_string).as_deref(), Some("some_variadic::A<int,double>"));

    let sb = engine.resolve_call("some_variadic::B", "sb", &[], &args).unwrap();
    assert_eq!(sb.signature_display(), "some_variadic::B::sb<int,double,std::string>(int&&,double&&,std::string&&)");
}

#[test]
fn lvalues_forward_as_references() {
    let engine = engine(VARIADIC);
    let double = engine.resolve_type("double").unwrap();
    let sb = engine
        .resolve_call("some_variadic::B", "sb", &[], &[Value::typed(double)])
        .unwrap();
    assert_eq!(sb.signature_display(), "some_variadic::B::sb<double&>(double&)");
}

#[test]
fn explicit_instantiations_are_reported() {
    let engine = engine(
        "template<class T> struct Reg { Reg(); };
         template class Reg<int>;
         extern template struct Reg<long>;",
    );
    assert!(engine.resolve_class("Reg<int>", &[]).unwrap().is_pre_instantiated());
    assert!(engine.resolve_class("Reg<long>", &[]).unwrap().is_pre_instantiated());
    assert!(!engine.resolve_class("Reg<short>", &[]).unwrap().is_pre_instantiated());
}

#[test]
fn class_entities_list_their_members() {
    let engine = engine("namespace geo { struct Point { double x; double y; double norm() const; }; }");
    let point = engine.resolve_class("geo::Point", &[]).unwrap();
    let names = point.member_names();
    for expected in ["x", "y", "norm"] {
        assert!(names.iter().any(|name| name == expected), "missing {expected} in {names:?}");
    }
    assert!(point.handle() != CompiledHandle(0));
}

#[test]
fn member_templates_take_const_references() {
    let engine = engine(
        "struct B {};
         struct Sizer { template<class T> int get_size(const T& t); };
         struct Wrap { template<class T> Wrap(const T& v); };",
    );
    let b = Value::instance(engine.resolve_type("B").unwrap());
    let size = engine.resolve_call("Sizer", "get_size", &[], &[b.clone()]).unwrap();
    assert_eq!(size.signature_display(), "Sizer::get_size<B>(const B&)");

    let wrapped = engine.resolve_constructor("Wrap", &[], &[b]).unwrap();
    assert_eq!(wrapped.kind(), EntityKind::Constructor);
    assert!(wrapped.is_template_instance());
    assert!(engine.resolve_constructor("Wrap", &[], &[Value::Int(3)]).unwrap().is_template_instance());
}

#[test]
fn inheriting_constructors_resolve() {
    let engine = engine("struct B { B(int); B(const B&); }; struct D : B { using B::B; D(double, double); };");
    let inherited = engine.resolve_constructor("D", &[], &[Value::Int(1)]).unwrap();
    assert_eq!(inherited.kind(), EntityKind::Constructor);
    assert_eq!(inherited.signature().map(|s| s.params.len()), Some(1));

    let own = engine
        .resolve_constructor("D", &[], &[Value::Float(1.0), Value::Float(2.0)])
        .unwrap();
    assert_eq!(own.signature().map(|s| s.params.len()), Some(2));
}

#[test]
fn templated_operators_on_instances() {
    let engine = engine(
        "namespace OperatorAddTest {
             template <class V> class CustomVec {
                 V fX;
             public:
                 CustomVec();
                 CustomVec(const V& a);
                 V X() const;
                 template <class fV> CustomVec operator+(const fV& v);
             };
         }",
    );
    let c = Value::instance(engine.resolve_type("OperatorAddTest::CustomVec<double>").unwrap());
    let d = Value::instance(engine.resolve_type("OperatorAddTest::CustomVec<int>").unwrap());
    let plus = engine.resolve_operator("+", &[c, d]).unwrap();
    assert_eq!(plus.kind(), EntityKind::Method);
    assert!(plus.is_template_instance());
    assert_eq!(
        plus.owner().map(ToString::to_string).as_deref(),
        Some("OperatorAddTest::CustomVec<double>")
    );
}
