use std::any::type_name;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};

use crate::assets::AssetSource;
use crate::component::{Component, ComponentContext, ComponentRegistry, Lifecycle};
use crate::math::{Matrix, Vector};
use crate::obj::{self, ObjError};
use crate::render::backend::GraphicsBackend;
use crate::render::{Mesh, MeshComponent, RenderError, Renderer};
use crate::scene::{Scene, SceneError};

static ENTITY_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A node of the scene graph.
///
/// Owns its children and at most one component per type. The matrices are
/// rebuilt as soon as position, rotation or scale change:
///
/// * model matrix: translation, then rotation about X, Y and Z
/// * transformation: model matrix times scale
///
/// Children are placed relative to their parent's *model* matrix, so a
/// parent's scale never reaches its children.
#[derive(Debug)]
pub struct Entity {
    name: String,
    position: Vector,
    rotation: Vector,
    scale: Vector,
    model_matrix: Matrix,
    transformation: Matrix,
    children: Vec<Entity>,
    components: ComponentRegistry,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    /// An entity with a generated `EntityN` name.
    pub fn new() -> Self {
        let n = ENTITY_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::named(format!("Entity{n}"))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vector::ZERO,
            rotation: Vector::ZERO,
            scale: Vector::ONE,
            model_matrix: Matrix::identity(),
            transformation: Matrix::identity(),
            children: Vec::new(),
            components: ComponentRegistry::new(),
        }
    }

    /// An entity drawing a single mesh.
    pub fn with_mesh(mesh: Mesh) -> Self {
        Self::with_meshes(vec![mesh])
    }

    pub fn with_meshes(meshes: Vec<Mesh>) -> Self {
        let mut entity = Self::new();
        entity.add_component(MeshComponent::new(meshes));
        entity
    }

    /// Loads an OBJ model (and its materials and textures) into a new entity.
    pub async fn load_obj<A, B>(
        name: impl Into<String>,
        path: &str,
        assets: &A,
        renderer: &mut Renderer<B>,
    ) -> Result<Self, ObjError>
    where
        A: AssetSource,
        B: GraphicsBackend,
    {
        let meshes = obj::load_obj(path, assets, renderer).await?;
        let mut entity = Self::named(name);
        entity.add_component(MeshComponent::new(meshes));
        Ok(entity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn rotation(&self) -> Vector {
        self.rotation
    }

    pub fn scale(&self) -> Vector {
        self.scale
    }

    pub fn set_position(&mut self, position: Vector) {
        self.position = position;
        self.update_matrices();
    }

    /// Euler angles in radians.
    pub fn set_rotation(&mut self, rotation: Vector) {
        self.rotation = rotation;
        self.update_matrices();
    }

    pub fn set_scale(&mut self, scale: Vector) {
        self.scale = scale;
        self.update_matrices();
    }

    pub fn translate(&mut self, offset: Vector) {
        self.set_position(self.position + offset);
    }

    pub fn rotate(&mut self, angles: Vector) {
        self.set_rotation(self.rotation + angles);
    }

    pub fn model_matrix(&self) -> &Matrix {
        &self.model_matrix
    }

    pub fn transformation(&self) -> &Matrix {
        &self.transformation
    }

    /// Unit vector the entity faces, from its yaw.
    pub fn forward(&self) -> Vector {
        let (sin, cos) = self.rotation.y.sin_cos();
        Vector::new(sin, 0.0, -cos)
    }

    pub fn right(&self) -> Vector {
        let (sin, cos) = self.rotation.y.sin_cos();
        Vector::new(-cos, 0.0, -sin)
    }

    fn update_matrices(&mut self) {
        self.model_matrix = Matrix::translate(self.position)
            .compose(&Matrix::rotate_x(self.rotation.x))
            .compose(&Matrix::rotate_y(self.rotation.y))
            .compose(&Matrix::rotate_z(self.rotation.z));
        self.transformation = self.model_matrix.compose(&Matrix::scale(self.scale));
    }

    /// Appends `child` and returns it. The graph must stay acyclic, which
    /// ownership guarantees.
    pub fn add_child(&mut self, child: Entity) -> &mut Entity {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Detaches the first direct child called `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<Entity> {
        let index = self.children.iter().position(|child| child.name == name)?;
        Some(self.children.remove(index))
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Entity] {
        &mut self.children
    }

    /// First direct child called `name`.
    pub fn get_child(&self, name: &str) -> Option<&Entity> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn get_child_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn expect_child(&self, name: &str) -> Result<&Entity, SceneError> {
        self.get_child(name).ok_or_else(|| SceneError::MissingChild {
            entity: self.name.clone(),
            child: name.to_string(),
        })
    }

    /// Depth-first search starting with `self`.
    pub fn find(&self, name: &str) -> Option<&Entity> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Entity> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(name))
    }

    /// Stores `component`, replacing any component of the same type.
    pub fn add_component<C: Component>(&mut self, component: C) {
        self.components.insert(component);
    }

    pub fn get_component<C: Component>(&self) -> Option<&C> {
        self.components.get()
    }

    pub fn get_component_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components.get_mut()
    }

    pub fn remove_component<C: Component>(&mut self) -> Option<C> {
        self.components.remove()
    }

    pub fn expect_component<C: Component>(&self) -> Result<&C, SceneError> {
        self.get_component().ok_or_else(|| SceneError::MissingComponent {
            entity: self.name.clone(),
            component: type_name::<C>(),
        })
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Runs `lifecycle` on the whole subtree: every child's subtree first,
    /// then this entity's components in insertion order.
    pub fn invoke(
        &mut self,
        lifecycle: Lifecycle,
        scene: &mut Scene,
        delta_time: f32,
    ) -> Result<()> {
        for child in &mut self.children {
            child.invoke(lifecycle, scene, delta_time)?;
        }
        for type_id in self.components.type_ids() {
            let Some(mut component) = self.components.take(type_id) else {
                continue;
            };
            let name = component.as_ref().component_name();
            let mut ctx = ComponentContext {
                scene: &mut *scene,
                entity: &mut *self,
                delta_time,
            };
            let result = lifecycle.invoke(component.as_mut(), &mut ctx);
            self.components.restore(type_id, component);
            result.with_context(|| format!("{lifecycle} failed for {name} on `{}`", self.name))?;
        }
        Ok(())
    }

    /// Calls `visit` for every node with the matrix its own geometry is drawn
    /// with, parents before children.
    pub fn visit_world_transforms<E>(
        &self,
        visit: &mut impl FnMut(&Entity, &Matrix) -> Result<(), E>,
    ) -> Result<(), E> {
        self.visit_from(&Matrix::identity(), visit)
    }

    fn visit_from<E>(
        &self,
        parent: &Matrix,
        visit: &mut impl FnMut(&Entity, &Matrix) -> Result<(), E>,
    ) -> Result<(), E> {
        visit(self, &parent.compose(&self.transformation))?;
        let placement = parent.compose(&self.model_matrix);
        for child in &self.children {
            child.visit_from(&placement, visit)?;
        }
        Ok(())
    }

    /// Draws every node carrying a [`MeshComponent`].
    pub fn render<B: GraphicsBackend>(
        &self,
        scene: &Scene,
        renderer: &mut Renderer<B>,
    ) -> Result<(), RenderError> {
        let result = self.visit_world_transforms(&mut |entity, world| {
            match entity.get_component::<MeshComponent>() {
                Some(meshes) => meshes.render(renderer, scene, world),
                None => Ok(()),
            }
        });
        renderer.unbind_program();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use parking_lot::Mutex;

    use super::*;
    use crate::component::Spin;
    use crate::light::Light;
    use crate::render::backend::{HeadlessBackend, UniformValue};
    use crate::render::Cube;

    fn assert_vec_eq(a: Vector, b: Vector) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    fn world_transforms(root: &Entity) -> Vec<(String, Matrix)> {
        let mut out = Vec::new();
        root.visit_world_transforms(&mut |entity, world| {
            out.push((entity.name().to_string(), world.clone()));
            Ok::<_, Infallible>(())
        })
        .unwrap();
        out
    }

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        label: &'static str,
        log: Log,
    }

    impl Component for Recorder {
        fn start(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<()> {
            self.log.lock().push(format!("start {}", self.label));
            Ok(())
        }

        fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
            self.log
                .lock()
                .push(format!("update {} on {}", self.label, ctx.entity.name()));
            Ok(())
        }
    }

    #[test]
    fn names_are_generated_and_unique() {
        let a = Entity::new();
        let b = Entity::new();
        assert!(a.name().starts_with("Entity"));
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn transformation_without_rotation_is_translate_then_scale() {
        let mut entity = Entity::named("e");
        entity.set_position(Vector::new(1.0, 2.0, 3.0));
        entity.set_scale(Vector::new(2.0, 3.0, 4.0));
        let t = entity.transformation();
        assert_vec_eq(
            t.transform_point(Vector::ZERO).unwrap(),
            Vector::new(1.0, 2.0, 3.0),
        );
        assert_vec_eq(
            t.transform_point(Vector::ONE).unwrap(),
            Vector::new(3.0, 5.0, 7.0),
        );
        // model matrix ignores scale
        assert_vec_eq(
            entity.model_matrix().transform_point(Vector::ONE).unwrap(),
            Vector::new(2.0, 3.0, 4.0),
        );
    }

    #[test]
    fn matrices_follow_every_mutation() {
        let mut entity = Entity::named("e");
        entity.translate(Vector::X);
        entity.translate(Vector::X);
        assert_vec_eq(
            entity.model_matrix().transform_point(Vector::ZERO).unwrap(),
            Vector::new(2.0, 0.0, 0.0),
        );
        entity.rotate(Vector::new(0.0, 0.25, 0.0));
        entity.rotate(Vector::new(0.0, 0.25, 0.0));
        assert_relative_eq!(entity.rotation().y, 0.5);
        let expected = Matrix::translate(Vector::new(2.0, 0.0, 0.0)).compose(&Matrix::rotate_y(0.5));
        for (a, b) in entity.model_matrix().as_slice().iter().zip(expected.as_slice()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn parent_scale_does_not_reach_children() {
        let mut parent = Entity::named("parent");
        parent.set_scale(Vector::splat(2.0));
        let mut child = Entity::named("child");
        child.set_position(Vector::new(1.0, 0.0, 0.0));
        parent.add_child(child);

        let transforms = world_transforms(&parent);
        let (name, child_world) = &transforms[1];
        assert_eq!(name, "child");
        assert_vec_eq(
            child_world.transform_point(Vector::ZERO).unwrap(),
            Vector::new(1.0, 0.0, 0.0),
        );
        // the parent's own geometry is scaled
        assert_vec_eq(
            transforms[0].1.transform_point(Vector::X).unwrap(),
            Vector::new(2.0, 0.0, 0.0),
        );
    }

    #[test]
    fn parent_translation_and_rotation_reach_children() {
        let mut parent = Entity::named("parent");
        parent.set_position(Vector::new(0.0, 5.0, 0.0));
        parent.set_rotation(Vector::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        let mut child = Entity::named("child");
        child.set_position(Vector::new(1.0, 0.0, 0.0));
        let grandchild = Entity::named("grandchild");
        child.add_child(grandchild);
        parent.add_child(child);

        let transforms = world_transforms(&parent);
        let names: Vec<_> = transforms.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["parent", "child", "grandchild"]);
        let expected = Matrix::rotate_y(std::f32::consts::FRAC_PI_2)
            .transform_point(Vector::X)
            .unwrap()
            + Vector::new(0.0, 5.0, 0.0);
        assert_vec_eq(
            transforms[2].1.transform_point(Vector::ZERO).unwrap(),
            expected,
        );
    }

    #[test]
    fn children_update_before_parent() {
        let log = Log::default();
        let mut root = Entity::named("root");
        root.add_component(Recorder {
            label: "root",
            log: log.clone(),
        });
        let mut child = Entity::named("child");
        child.add_component(Recorder {
            label: "child",
            log: log.clone(),
        });
        let mut grandchild = Entity::named("grandchild");
        grandchild.add_component(Recorder {
            label: "grandchild",
            log: log.clone(),
        });
        child.add_child(grandchild);
        root.add_child(child);

        let mut scene = Scene::default();
        root.invoke(Lifecycle::Start, &mut scene, 0.0).unwrap();
        root.invoke(Lifecycle::Update, &mut scene, 0.016).unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "start grandchild",
                "start child",
                "start root",
                "update grandchild on grandchild",
                "update child on child",
                "update root on root",
            ]
        );
    }

    #[test]
    fn parent_update_sees_updated_child() {
        struct Follow {
            seen: Option<Vector>,
        }
        impl Component for Follow {
            fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
                let child = ctx.entity.expect_child("mover")?;
                self.seen = Some(child.rotation());
                Ok(())
            }
        }

        let mut root = Entity::named("root");
        root.add_component(Follow { seen: None });
        let mut mover = Entity::named("mover");
        mover.add_component(Spin::new(Vector::new(0.0, 2.0, 0.0)));
        root.add_child(mover);

        root.invoke(Lifecycle::Update, &mut Scene::default(), 0.5).unwrap();
        let seen = root.get_component::<Follow>().unwrap().seen.unwrap();
        assert_vec_eq(seen, Vector::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn components_reach_siblings_and_scene() {
        #[derive(Default)]
        struct Counter(u32);
        impl Component for Counter {}

        struct Bump;
        impl Component for Bump {
            fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
                ctx.entity.expect_component::<Counter>()?;
                if let Some(counter) = ctx.entity.get_component_mut::<Counter>() {
                    counter.0 += 1;
                }
                ctx.scene.camera.fog_density = 0.5;
                Ok(())
            }
        }

        let mut entity = Entity::named("e");
        entity.add_component(Counter::default());
        entity.add_component(Bump);
        let mut scene = Scene::default();
        entity.invoke(Lifecycle::Update, &mut scene, 0.1).unwrap();
        entity.invoke(Lifecycle::Update, &mut scene, 0.1).unwrap();
        assert_eq!(entity.get_component::<Counter>().unwrap().0, 2);
        assert_eq!(scene.camera.fog_density, 0.5);
        assert!(entity.get_component::<Bump>().is_some());
    }

    #[test]
    fn running_component_is_detached_from_its_entity() {
        struct Marker;
        impl Component for Marker {}

        #[derive(Default)]
        struct Inspect(Vec<(bool, bool)>);
        impl Component for Inspect {
            fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
                self.0.push((
                    ctx.entity.get_component::<Inspect>().is_some(),
                    ctx.entity.get_component::<Marker>().is_some(),
                ));
                Ok(())
            }
        }

        let mut entity = Entity::named("e");
        entity.add_component(Inspect::default());
        entity.add_component(Marker);
        entity.invoke(Lifecycle::Update, &mut Scene::default(), 0.0).unwrap();
        assert_eq!(entity.get_component::<Inspect>().unwrap().0, vec![(false, true)]);
    }

    #[test]
    fn failing_hook_reports_entity() {
        struct Broken;
        impl Component for Broken {
            fn update(&mut self, ctx: &mut ComponentContext<'_>) -> Result<()> {
                ctx.entity.expect_component::<Spin>()?;
                Ok(())
            }
        }

        let mut entity = Entity::named("ship");
        entity.add_component(Broken);
        let err = entity
            .invoke(Lifecycle::Update, &mut Scene::default(), 0.1)
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("update failed"));
        assert!(message.contains("`ship`"));
        assert!(err.root_cause().to_string().contains("Spin"));
    }

    #[test]
    fn find_searches_depth_first_including_self() {
        let mut root = Entity::named("root");
        let mut a = Entity::named("a");
        a.add_child(Entity::named("target"));
        root.add_child(a);
        root.add_child(Entity::named("target"));

        assert_eq!(root.find("root").unwrap().name(), "root");
        assert!(root.get_child("target").is_some());
        assert!(root.get_child("missing").is_none());
        assert!(root.expect_child("missing").is_err());
        assert!(root.get_child("a").unwrap().get_child("target").is_some());
        assert!(root.find("missing").is_none());

        root.find_mut("target").unwrap().set_name("found");
        assert!(root.get_child("a").unwrap().get_child("found").is_some());
        assert!(root.get_child("target").is_some());
    }

    #[test]
    fn remove_child_detaches_subtree() {
        let mut root = Entity::named("root");
        root.add_child(Entity::named("a")).add_child(Entity::named("b"));
        let removed = root.remove_child("a").unwrap();
        assert_eq!(removed.children().len(), 1);
        assert!(root.children().is_empty());
        assert!(root.remove_child("a").is_none());
    }

    #[test]
    fn forward_and_right_follow_yaw() {
        let mut entity = Entity::named("e");
        assert_vec_eq(entity.forward(), Vector::new(0.0, 0.0, -1.0));
        assert_vec_eq(entity.right(), Vector::new(-1.0, 0.0, 0.0));
        entity.set_rotation(Vector::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        assert_vec_eq(entity.forward(), Vector::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn render_draws_mesh_nodes_with_single_light_upload() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let mut scene = Scene::default();
        scene
            .add_light(Light::point(Vector::new(0.0, 4.0, 0.0), Vector::ONE, 1.0))
            .unwrap();

        let mut root = Entity::named("group");
        root.set_scale(Vector::splat(2.0));
        let mut a = Entity::with_mesh(Mesh::initialize(&Cube::default(), &mut renderer));
        a.set_position(Vector::new(1.0, 0.0, 0.0));
        let b = Entity::with_meshes(vec![
            Mesh::initialize(&Cube::default(), &mut renderer),
            Mesh::initialize(&Cube::default(), &mut renderer),
        ]);
        root.add_child(a);
        root.add_child(b);

        root.render(&scene, &mut renderer).unwrap();
        assert_eq!(renderer.bound_program(), None);
        let backend = renderer.backend();
        assert_eq!(backend.draw_calls(), 3);
        assert_eq!(backend.program_binds(), 1);
        assert_eq!(backend.uniform_uploads("light_count"), vec![&UniformValue::Int(1)]);

        let translated = Matrix::translate(Vector::new(1.0, 0.0, 0.0));
        assert_eq!(
            backend.uniform_uploads("m_matrix")[0],
            &UniformValue::from_matrix(&translated).unwrap()
        );
    }

    #[test]
    fn each_frame_rebinds_and_reuploads_lights() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let scene = Scene::default();
        let root = Entity::with_mesh(Mesh::initialize(&Cube::default(), &mut renderer));
        root.render(&scene, &mut renderer).unwrap();
        root.render(&scene, &mut renderer).unwrap();
        assert_eq!(renderer.backend().program_binds(), 2);
        assert_eq!(renderer.backend().uniform_uploads("light_count").len(), 2);
    }
}
