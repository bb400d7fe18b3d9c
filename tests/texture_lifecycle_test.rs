use std::collections::HashSet;

use emte::{
    Game, Settings,
    data_structures::descriptor_pile::{DESCRIPTOR_COUNT, Descriptors},
    resources::{TextureFactory, TextureLibrary},
};

use crate::common::test_utils::{FakeFactory, names};

mod common;

#[test]
fn default_load_list_gets_distinct_handles() {
    let settings = Settings::default();
    let mut library = TextureLibrary::new(settings.texture_load_list.clone());
    let mut factory = FakeFactory::default();
    library.load(&mut factory).unwrap();

    assert_eq!(library.registry().len(), settings.texture_load_list.len());
    let mut slots = HashSet::new();
    let mut descs = HashSet::new();
    for (name, handle) in library.registry().iter() {
        assert!(slots.insert(handle.slot), "slot of {} reused", name);
        assert!(descs.insert(handle.desc), "descriptor of {} reused", name);
        assert!(handle.desc >= Descriptors::Reserve as usize);
        assert!(handle.desc < DESCRIPTOR_COUNT);
        assert_eq!(library.descriptor(name).map(String::as_str), Some(name));
    }
}

#[test]
fn scene_textures_are_on_the_default_load_list() {
    let settings = Settings::default();
    let scene = &settings.scene_textures;
    for name in [
        &scene.sphere_diffuse,
        &scene.sphere_normal,
        &scene.floor_diffuse,
        &scene.floor_normal,
        &scene.sprite,
    ] {
        assert!(settings.texture_load_list.contains(name), "{} missing", name);
    }
}

#[test]
fn lost_then_restored_registry_has_the_same_size() {
    let mut library = TextureLibrary::new(names(&["a.png", "b.png", "c.png", "b.png"]));
    let mut factory = FakeFactory::default();
    library.load(&mut factory).unwrap();
    let initial = library.registry().len();
    let initial_descs: HashSet<_> = library.registry().iter().map(|(_, h)| h.desc).collect();

    // device lost
    library.release();
    factory.release();
    assert!(library.registry().is_empty());
    assert_eq!(library.pile().allocated(), 0);
    assert!(factory.textures.is_empty());

    // device restored
    library.load(&mut factory).unwrap();
    assert_eq!(library.registry().len(), initial);
    let restored_descs: HashSet<_> = library.registry().iter().map(|(_, h)| h.desc).collect();
    assert_eq!(restored_descs, initial_descs);
    assert_eq!(factory.releases, 1);
}

#[test]
fn repeated_resets_do_not_leak_descriptors() {
    let mut library = TextureLibrary::new(names(&["a.png", "b.png"]));
    let mut factory = FakeFactory::default();
    for _ in 0..DESCRIPTOR_COUNT {
        library.release();
        factory.release();
        library.load(&mut factory).unwrap();
    }
    assert_eq!(library.pile().allocated(), 2);
}

#[test]
fn default_size_never_changes() {
    let first = Game::default_size();
    for _ in 0..10 {
        assert_eq!(Game::default_size(), first);
    }
    assert!(first.0 > 0 && first.1 > 0);
}
