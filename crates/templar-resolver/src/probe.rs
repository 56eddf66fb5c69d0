//! Capability probes. A probe that cannot be answered answers `false`.

use templar_core::TypeDescriptor;

use crate::context::ResolutionContext;

impl ResolutionContext<'_> {
    /// Whether `ty` is a class with a member named `name`, declared,
    /// inherited or brought in by a using-declaration.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn has_member(&self, ty: &TypeDescriptor, name: &str) -> bool {
        let ty = ty.strip_reference();
        if !ty.is_class() || ty.is_pointer() {
            return false;
        }
        let Ok(frame) = self.class_frame(&ty) else {
            return false;
        };
        if self.member_lookup(&frame, name).is_ok_and(|hits| !hits.is_empty()) {
            return true;
        }
        matches!(self.member_type(&frame, name), Ok(Some(_)))
    }

    pub fn is_integral(&self, ty: &TypeDescriptor) -> bool {
        ty.strip_reference().as_primitive().is_some_and(|kind| kind.is_integral())
    }

    pub fn is_floating(&self, ty: &TypeDescriptor) -> bool {
        ty.strip_reference().as_primitive().is_some_and(|kind| kind.is_floating())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{engine_with, resolve};

    #[test]
    fn member_probes_see_declared_and_inherited_members() {
        let engine = engine_with(
            "struct Base { int var1; }; struct Derived : Base {}; struct Other { void f(); }; \
             template<class T> struct Holder { T var1; };",
        );
        let ctx = engine.context();
        assert!(ctx.has_member(&resolve(&engine, "Base"), "var1"));
        assert!(ctx.has_member(&resolve(&engine, "Derived"), "var1"));
        assert!(ctx.has_member(&resolve(&engine, "Holder<int>&"), "var1"));
        assert!(!ctx.has_member(&resolve(&engine, "Other"), "var1"));
        assert!(!ctx.has_member(&resolve(&engine, "int"), "var1"));
        assert!(!ctx.has_member(&resolve(&engine, "Base*"), "var1"));
    }

    #[test]
    fn arithmetic_probes() {
        let engine = engine_with("enum E { A };");
        let ctx = engine.context();
        assert!(ctx.is_integral(&resolve(&engine, "unsigned long")));
        assert!(ctx.is_integral(&resolve(&engine, "const bool&")));
        assert!(!ctx.is_integral(&resolve(&engine, "E")));
        assert!(!ctx.is_integral(&resolve(&engine, "int*")));
        assert!(ctx.is_floating(&resolve(&engine, "long double")));
        assert!(!ctx.is_floating(&resolve(&engine, "int")));
    }
}
