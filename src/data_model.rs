use std::sync::Arc;

use parking_lot::RwLock;

use crate::scene::PassScene;

/// Hand-off point between threads that build scenes and the render thread.
///
/// Producers publish complete scenes; the render thread takes a snapshot at
/// the start of each frame and keeps it for the whole frame.
#[derive(Debug, Default)]
pub struct SceneStore {
    current: Arc<RwLock<Arc<PassScene>>>,
    generation: Arc<RwLock<u64>>,
}

impl Clone for SceneStore {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl SceneStore {
    /// Creates a store holding an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `scene`.
    pub fn from_scene(scene: PassScene) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(scene))),
            generation: Arc::new(RwLock::new(0)),
        }
    }

    /// Replaces the current scene; frames already running keep their snapshot.
    pub fn publish(&self, scene: PassScene) {
        let scene = Arc::new(scene);
        let mut generation = self.generation.write();
        *self.current.write() = scene;
        *generation += 1;
    }

    /// Returns the latest published scene.
    pub fn snapshot(&self) -> Arc<PassScene> {
        Arc::clone(&*self.current.read())
    }

    /// Number of scenes published since creation.
    pub fn generation(&self) -> u64 {
        *self.generation.read()
    }

    /// Applies a mutation to a copy of the current scene and publishes it.
    pub fn update<F>(&self, updater: F)
    where
        F: FnOnce(&mut PassScene),
    {
        let mut generation = self.generation.write();
        let mut current = self.current.write();
        let mut scene = PassScene::clone(&current);
        updater(&mut scene);
        *current = Arc::new(scene);
        *generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::OmniLight;
    use crate::scene::LightNode;
    use crate::transform::Transform;
    use glam::Vec3;

    fn omni(name: &str) -> LightNode<OmniLight> {
        LightNode::new(name, Transform::IDENTITY, OmniLight::default())
    }

    #[test]
    fn snapshots_survive_later_publishes() {
        let store = SceneStore::new();
        let before = store.snapshot();
        store.publish(PassScene {
            omni_lights: vec![omni("a")],
            ..PassScene::default()
        });
        assert_eq!(before.light_count(), 0);
        assert_eq!(store.snapshot().light_count(), 1);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn update_publishes_a_modified_copy() {
        let store = SceneStore::from_scene(PassScene::default());
        let before = store.snapshot();
        store.update(|scene| scene.ambient = Vec3::ONE);
        assert_eq!(before.ambient, Vec3::ZERO);
        assert_eq!(store.snapshot().ambient, Vec3::ONE);
    }

    #[test]
    fn producer_thread_hands_off_complete_scenes() {
        let store = SceneStore::new();
        let producer = store.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                producer.publish(PassScene {
                    omni_lights: (0..=i).map(|n| omni(&n.to_string())).collect(),
                    ..PassScene::default()
                });
            }
        });
        handle.join().unwrap();
        assert_eq!(store.generation(), 10);
        assert_eq!(store.snapshot().omni_lights.len(), 10);
    }
}
