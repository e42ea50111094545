//! Scoped context swaps: admin elevation and alternate contexts.

use crate::common::registry;
use verso::{obj_alternate_context, obj_as_admin, Error, RequestContext, VersionedObject};

#[test]
fn admin_elevation_restores_on_exit() {
    let registry = registry();
    let ctx = RequestContext::new("fake-user", "fake-project");
    let mut obj = VersionedObject::with_context(registry.latest("Instance").unwrap(), ctx);
    {
        let guard = obj_as_admin(&mut obj).unwrap();
        let elevated = guard.context().unwrap();
        assert!(elevated.is_admin);
        assert_eq!(elevated.user_id, "fake-user");
    }
    assert!(!obj.context().unwrap().is_admin);
}

#[test]
fn admin_elevation_restores_on_error_path() {
    let registry = registry();
    let ctx = RequestContext::new("fake-user", "fake-project");
    let mut obj = VersionedObject::with_context(registry.latest("Instance").unwrap(), ctx);
    let result: Result<(), Error> = (|| {
        let mut guard = obj_as_admin(&mut obj)?;
        guard.set("vcpus", "not-a-number")?;
        Ok(())
    })();
    assert!(result.is_err());
    assert!(!obj.context().unwrap().is_admin);
}

#[test]
fn admin_elevation_restores_on_panic() {
    let registry = registry();
    let ctx = RequestContext::new("fake-user", "fake-project");
    let mut obj = VersionedObject::with_context(registry.latest("Instance").unwrap(), ctx);
    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = obj_as_admin(&mut obj).unwrap();
        panic!("boom");
    }));
    assert!(caught.is_err());
    assert!(!obj.context().unwrap().is_admin);
}

#[test]
fn admin_elevation_of_orphan_fails() {
    let registry = registry();
    let mut obj = VersionedObject::new(registry.latest("Instance").unwrap());
    assert!(matches!(
        obj_as_admin(&mut obj).unwrap_err(),
        Error::Orphaned { .. }
    ));
}

#[test]
fn alternate_context_swaps_and_restores() {
    let registry = registry();
    let ctx = RequestContext::new("fake-user", "fake-project");
    let mut obj = VersionedObject::with_context(registry.latest("Instance").unwrap(), ctx);
    {
        let guard = obj_alternate_context(&mut obj, RequestContext::admin("auditor", "ops"));
        assert_eq!(guard.context().unwrap().user_id, "auditor");
    }
    assert_eq!(obj.context().unwrap().user_id, "fake-user");
}

#[test]
fn alternate_context_works_on_orphans() {
    let registry = registry();
    let mut obj = VersionedObject::new(registry.latest("Instance").unwrap());
    {
        let guard = obj_alternate_context(&mut obj, RequestContext::new("temp", "proj"));
        assert_eq!(guard.context().unwrap().user_id, "temp");
    }
    assert!(obj.context().is_none());
}

#[test]
fn guards_nest() {
    let registry = registry();
    let ctx = RequestContext::new("fake-user", "fake-project");
    let mut obj = VersionedObject::with_context(registry.latest("Instance").unwrap(), ctx);
    {
        let mut outer = obj_alternate_context(&mut obj, RequestContext::new("outer", "proj"));
        {
            let inner = obj_as_admin(&mut outer).unwrap();
            assert!(inner.context().unwrap().is_admin);
            assert_eq!(inner.context().unwrap().user_id, "outer");
        }
        assert!(!outer.context().unwrap().is_admin);
    }
    assert_eq!(obj.context().unwrap().user_id, "fake-user");
}
