mod support;

use std::rc::Rc;

use ecadaptor::schema::{
    ClassKind, ClassModifier, ColumnKind, MapStrategy, PrimitiveType, PropertyKind, TableKind,
};
use ecadaptor::{AdaptorError, CatalogStore, Id64, MapCache, Result};
use support::{memory_catalog, seed_catalog, CountingStore};

fn cache() -> Result<MapCache> {
    let store: Rc<dyn CatalogStore> = Rc::new(memory_catalog(seed_catalog)?);
    Ok(MapCache::new(store))
}

#[test]
fn table_reports_kind_root_and_discriminator() -> Result<()> {
    let mut cache = cache()?;
    let root = cache.table("ts_Root")?.expect("ts_Root is mapped");
    assert_eq!(root.name, "ts_Root");
    assert_eq!(root.kind, TableKind::Primary);
    assert_eq!(root.exclusive_root_class_id, Id64(0x10));
    assert_eq!(root.class_id_column, "ECClassId");
    assert!(!root.is_class_id_virtual);
    assert!(!root.is_virtual());

    let overflow = cache.table("ts_Root_Overflow")?.expect("overflow is mapped");
    assert_eq!(overflow.kind, TableKind::Overflow);

    let aspect = cache.table("ts_Aspect")?.expect("aspect is mapped");
    assert!(aspect.is_class_id_virtual);

    let ghost = cache.table("ts_Ghost")?.expect("ghost is mapped");
    assert!(ghost.is_virtual());
    Ok(())
}

#[test]
fn tables_without_instances_are_absent() -> Result<()> {
    let mut cache = cache()?;
    assert!(cache.table("ts_Local")?.is_none());
    assert!(cache.table("be_Prop")?.is_none());
    Ok(())
}

#[test]
fn class_map_collects_mapped_properties() -> Result<()> {
    let mut cache = cache()?;
    let widget = cache.class_map(Id64(0x20))?.expect("widget is mapped");
    assert_eq!(widget.full_name, "TestSchema.Widget");
    assert_eq!(widget.kind, ClassKind::Entity);
    assert_eq!(widget.modifier, ClassModifier::None);
    assert_eq!(widget.map_strategy, MapStrategy::TablePerHierarchy);

    let names: Vec<&str> = widget.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        ["Name", "FederationGuid", "Owner", "Origin", "Tags", "Notes"]
    );

    let guid = widget.property("FederationGuid").expect("guid");
    assert_eq!(guid.primitive_type, Some(PrimitiveType::Binary));
    assert!(guid.is_guid());

    let owner = widget.property("Owner").expect("owner");
    assert_eq!(owner.kind, PropertyKind::Navigation);
    let rel = owner.navigation_relationship.as_ref().expect("relationship");
    assert_eq!(rel.id, Id64(0x30));
    assert_eq!(rel.name, "TestSchema.WidgetOwnsWidget");
    let rel_column = owner
        .columns
        .iter()
        .find(|col| col.is_rel_class_id())
        .expect("rel class id column");
    assert!(rel_column.is_virtual);

    let origin = widget.property("Origin").expect("origin");
    assert_eq!(origin.kind, PropertyKind::Struct);
    assert_eq!(origin.struct_class.as_ref().map(|c| c.id), Some(Id64(0x40)));
    let mut access: Vec<&str> = origin
        .columns
        .iter()
        .map(|col| col.access_string.as_str())
        .collect();
    access.sort_unstable();
    assert_eq!(access, ["Origin.X", "Origin.Y"]);
    assert!(origin.columns.iter().all(|col| col.kind == ColumnKind::Shared));

    let notes = widget.property("Notes").expect("notes");
    assert_eq!(notes.columns_in("ts_Root_Overflow").count(), 1);
    assert_eq!(notes.columns_in("ts_Root").count(), 0);
    Ok(())
}

#[test]
fn class_map_of_subclass_includes_its_own_properties() -> Result<()> {
    let mut cache = cache()?;
    let widget = cache.class_map(Id64(0x20))?.expect("widget");
    let gadget = cache.class_map(Id64(0x21))?.expect("gadget");
    assert!(widget.property("Extra").is_none());
    assert!(gadget.property("Extra").is_some());
    assert!(gadget.property("Name").is_some());
    Ok(())
}

#[test]
fn virtual_table_columns_are_virtual() -> Result<()> {
    let mut cache = cache()?;
    let ghost = cache.class_map(Id64(0x60))?.expect("ghost");
    let label = ghost.property("Label").expect("label");
    assert!(label.columns.iter().all(|col| col.is_virtual));
    Ok(())
}

#[test]
fn classes_without_mapped_properties_still_resolve() -> Result<()> {
    let mut cache = cache()?;
    let point = cache.class_map(Id64(0x40))?.expect("struct class");
    assert_eq!(point.kind, ClassKind::Struct);
    assert!(point.properties.is_empty());
    assert!(cache.class_map(Id64(0x9999))?.is_none());
    Ok(())
}

#[test]
fn abstract_root_is_reported() -> Result<()> {
    let mut cache = cache()?;
    let root = cache.class_map(Id64(0x10))?.expect("root");
    assert_eq!(root.modifier, ClassModifier::Abstract);
    Ok(())
}

#[test]
fn derived_classes_follow_hierarchy_closure() -> Result<()> {
    let cache = cache()?;
    let mut ids = cache.derived_classes("TestSchema.Root")?;
    ids.sort();
    assert_eq!(ids, [Id64(0x10), Id64(0x20), Id64(0x21)]);

    let mut by_alias = cache.derived_classes("ts:widget")?;
    by_alias.sort();
    assert_eq!(by_alias, [Id64(0x20), Id64(0x21)]);

    assert_eq!(cache.derived_classes("TestSchema.Gadget")?, [Id64(0x21)]);
    assert!(cache.derived_classes("TestSchema.Nothing")?.is_empty());
    assert!(matches!(
        cache.derived_classes("Widget"),
        Err(AdaptorError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn repeated_lookups_hit_the_cache() -> Result<()> {
    let store = CountingStore::new(memory_catalog(seed_catalog)?);
    let dyn_store: Rc<dyn CatalogStore> = store.clone();
    let mut cache = MapCache::new(dyn_store);

    let first = cache.table("ts_Root")?.expect("table");
    let again = cache.table("ts_Root")?.expect("table");
    assert!(Rc::ptr_eq(&first, &again));
    let widget = cache.class_map(Id64(0x20))?.expect("class");
    let widget_again = cache.class_map(Id64(0x20))?.expect("class");
    assert!(Rc::ptr_eq(&widget, &widget_again));
    assert_eq!(store.calls(), 2);

    cache.table("ts_Local")?;
    cache.table("ts_Local")?;
    assert_eq!(store.calls(), 4);

    let stats = cache.stats();
    assert_eq!(stats.table_hits, 1);
    assert_eq!(stats.table_misses, 3);
    assert_eq!(stats.class_hits, 1);
    assert_eq!(stats.class_misses, 1);
    Ok(())
}
