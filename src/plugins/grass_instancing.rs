// Instanced render nodes for the two grass tiers.
//
// Each tier entity pairs one blade geometry level with a fixed-capacity
// per-instance transform buffer. The GPU buffer is allocated once at
// capacity (worst case: every blade in one tier) and never reallocated;
// each frame only the active prefix written by the LOD classifier is
// uploaded, and the draw call submits exactly `0..active` instances.
//
// The pipeline extends the standard mesh pipeline with an instance-rate
// vertex buffer (one 4x4 model matrix) and a third bind group carrying the
// shared shading uniform record. Both tiers bind the same uniform buffer.

use bevy::{
    core_pipeline::core_3d::Transparent3d,
    ecs::{
        query::QueryItem,
        system::{lifetimeless::SRes, SystemParamItem},
    },
    pbr::{
        MeshPipeline, MeshPipelineKey, RenderMeshInstances, SetMeshBindGroup, SetMeshViewBindGroup,
    },
    prelude::*,
    render::{
        extract_component::{ExtractComponent, ExtractComponentPlugin},
        extract_resource::ExtractResourcePlugin,
        mesh::{GpuBufferInfo, GpuMesh, MeshVertexBufferLayoutRef},
        render_asset::RenderAssets,
        render_phase::{
            AddRenderCommand, DrawFunctions, PhaseItem, PhaseItemExtraIndex, RenderCommand,
            RenderCommandResult, SetItemPipeline, TrackedRenderPass, ViewSortedRenderPhases,
        },
        render_resource::{binding_types::uniform_buffer, *},
        renderer::{RenderDevice, RenderQueue},
        view::ExtractedView,
        Render, RenderApp, RenderSet,
    },
    utils::HashMap,
};
use bytemuck::{Pod, Zeroable};

use crate::plugins::grass_shading::GrassShadingParams;

const SHADER_ASSET_PATH: &str = "shaders/grass_instancing.wgsl";

/// Per-instance vertex data: one column-major model matrix.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct GrassInstanceData {
    model: [[f32; 4]; 4],
}

impl GrassInstanceData {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }
}

/// CPU side of one tier's transform buffer: preallocated to a fixed
/// capacity, carrying the active prefix and a dirty flag. The LOD classifier
/// is the only writer; the render world reads an extracted copy.
#[derive(Component, Clone)]
pub struct GrassTierInstances {
    data: Vec<GrassInstanceData>,
    capacity: usize,
    dirty: bool,
}

impl GrassTierInstances {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            dirty: false,
        }
    }

    /// Resets the running index for a fresh classification pass. The backing
    /// allocation is retained.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Bounds-guarded append: once the tier is full, further instances are
    /// silently dropped rather than growing past capacity.
    pub fn push(&mut self, instance: GrassInstanceData) {
        if self.data.len() < self.capacity {
            self.data.push(instance);
        }
    }

    /// Number of instances actually drawn this frame.
    pub fn active(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn as_slice(&self) -> &[GrassInstanceData] {
        &self.data
    }
}

impl ExtractComponent for GrassTierInstances {
    type QueryData = &'static GrassTierInstances;
    type QueryFilter = ();
    type Out = Self;

    fn extract_component(item: QueryItem<'_, Self::QueryData>) -> Option<Self> {
        Some(item.clone())
    }
}

/// GPU-facing uniform layout for the shared shading record. Field order
/// matches the WGSL struct.
#[derive(Clone, Default, ShaderType)]
pub struct GrassShadingUniform {
    wind_frequency: Vec2,
    time: f32,
    wind_speed: f32,
    tip_color: Vec4,
    base_color: Vec4,
    fog_color: Vec4,
    half_width: f32,
    blade_height: f32,
}

impl From<&GrassShadingParams> for GrassShadingUniform {
    fn from(p: &GrassShadingParams) -> Self {
        let c = |c: bevy::color::LinearRgba| Vec4::new(c.red, c.green, c.blue, c.alpha);
        Self {
            wind_frequency: p.wind_frequency,
            time: p.time,
            wind_speed: p.wind_speed,
            tip_color: c(p.tip_color),
            base_color: c(p.base_color),
            fog_color: c(p.fog_color),
            half_width: p.half_width,
            blade_height: p.blade_height,
        }
    }
}

pub struct GrassInstancingPlugin;

impl Plugin for GrassInstancingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ExtractComponentPlugin::<GrassTierInstances>::default(),
            ExtractResourcePlugin::<GrassShadingParams>::default(),
        ));
        app.sub_app_mut(RenderApp)
            .add_render_command::<Transparent3d, DrawGrassTier>()
            .init_resource::<SpecializedMeshPipelines<GrassInstancingPipeline>>()
            .init_resource::<GrassTierBuffers>()
            .init_resource::<GrassShadingUniformBuffer>()
            .add_systems(
                Render,
                (
                    queue_grass.in_set(RenderSet::QueueMeshes),
                    prepare_tier_buffers.in_set(RenderSet::PrepareResources),
                    prepare_shading_uniform.in_set(RenderSet::PrepareResources),
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        app.sub_app_mut(RenderApp)
            .init_resource::<GrassInstancingPipeline>();
    }
}

fn queue_grass(
    transparent_3d_draw_functions: Res<DrawFunctions<Transparent3d>>,
    pipeline: Res<GrassInstancingPipeline>,
    msaa: Res<Msaa>,
    mut pipelines: ResMut<SpecializedMeshPipelines<GrassInstancingPipeline>>,
    pipeline_cache: Res<PipelineCache>,
    meshes: Res<RenderAssets<GpuMesh>>,
    render_mesh_instances: Res<RenderMeshInstances>,
    grass_tiers: Query<Entity, With<GrassTierInstances>>,
    mut transparent_render_phases: ResMut<ViewSortedRenderPhases<Transparent3d>>,
    views: Query<(Entity, &ExtractedView)>,
) {
    let draw_grass = transparent_3d_draw_functions.read().id::<DrawGrassTier>();
    let msaa_key = MeshPipelineKey::from_msaa_samples(msaa.samples());

    for (view_entity, view) in &views {
        let Some(transparent_phase) = transparent_render_phases.get_mut(&view_entity) else {
            continue;
        };
        let view_key = msaa_key | MeshPipelineKey::from_hdr(view.hdr);
        let rangefinder = view.rangefinder3d();

        for entity in &grass_tiers {
            let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(entity) else {
                continue;
            };
            let Some(mesh) = meshes.get(mesh_instance.mesh_asset_id) else {
                continue;
            };
            let key = view_key | MeshPipelineKey::from_primitive_topology(mesh.primitive_topology());
            let Ok(pipeline_id) =
                pipelines.specialize(&pipeline_cache, &pipeline, key, &mesh.layout)
            else {
                continue;
            };
            transparent_phase.add(Transparent3d {
                entity,
                pipeline: pipeline_id,
                draw_function: draw_grass,
                distance: rangefinder.distance_translation(&mesh_instance.translation),
                batch_range: 0..1,
                extra_index: PhaseItemExtraIndex::NONE,
            });
        }
    }
}

struct TierGpuBuffer {
    buffer: Buffer,
    capacity: usize,
    /// Instances drawn this frame: the uploaded prefix length.
    length: usize,
}

/// Persistent per-tier GPU buffers, keyed by tier entity. Lives in the
/// render world across frames so the allocation happens exactly once.
#[derive(Resource, Default)]
struct GrassTierBuffers(HashMap<Entity, TierGpuBuffer>);

fn prepare_tier_buffers(
    query: Query<(Entity, &GrassTierInstances)>,
    mut buffers: ResMut<GrassTierBuffers>,
    render_device: Res<RenderDevice>,
    render_queue: Res<RenderQueue>,
) {
    for (entity, instances) in &query {
        let gpu = buffers.0.entry(entity).or_insert_with(|| {
            let capacity = instances.capacity().max(1);
            let size = (capacity * std::mem::size_of::<GrassInstanceData>()) as u64;
            TierGpuBuffer {
                buffer: render_device.create_buffer(&BufferDescriptor {
                    label: Some("grass tier instance buffer"),
                    size,
                    usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                capacity,
                length: 0,
            }
        });

        if instances.is_dirty() {
            let prefix = instances.as_slice();
            if !prefix.is_empty() {
                render_queue.write_buffer(&gpu.buffer, 0, bytemuck::cast_slice(prefix));
            }
            gpu.length = prefix.len().min(gpu.capacity);
        }
    }
}

#[derive(Resource, Default)]
struct GrassShadingUniformBuffer {
    buffer: UniformBuffer<GrassShadingUniform>,
    bind_group: Option<BindGroup>,
}

fn prepare_shading_uniform(
    params: Res<GrassShadingParams>,
    pipeline: Res<GrassInstancingPipeline>,
    mut uniform: ResMut<GrassShadingUniformBuffer>,
    render_device: Res<RenderDevice>,
    render_queue: Res<RenderQueue>,
) {
    uniform.buffer.set(GrassShadingUniform::from(params.as_ref()));
    uniform.buffer.write_buffer(&render_device, &render_queue);

    let bind_group = uniform.buffer.binding().map(|binding| {
        render_device.create_bind_group(
            "grass shading bind group",
            &pipeline.shading_layout,
            &BindGroupEntries::single(binding),
        )
    });
    uniform.bind_group = bind_group;
}

#[derive(Resource)]
struct GrassInstancingPipeline {
    shader: Handle<Shader>,
    mesh_pipeline: MeshPipeline,
    shading_layout: BindGroupLayout,
}

impl FromWorld for GrassInstancingPipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();
        let shading_layout = render_device.create_bind_group_layout(
            "grass shading layout",
            &BindGroupLayoutEntries::single(
                ShaderStages::VERTEX_FRAGMENT,
                uniform_buffer::<GrassShadingUniform>(false),
            ),
        );
        let mesh_pipeline = world.resource::<MeshPipeline>().clone();

        GrassInstancingPipeline {
            shader: world.load_asset(SHADER_ASSET_PATH),
            mesh_pipeline,
            shading_layout,
        }
    }
}

impl SpecializedMeshPipeline for GrassInstancingPipeline {
    type Key = MeshPipelineKey;

    fn specialize(
        &self,
        key: Self::Key,
        layout: &MeshVertexBufferLayoutRef,
    ) -> Result<RenderPipelineDescriptor, SpecializedMeshPipelineError> {
        let mut descriptor = self.mesh_pipeline.specialize(key, layout)?;

        descriptor.vertex.shader = self.shader.clone();
        descriptor.vertex.buffers.push(VertexBufferLayout {
            array_stride: std::mem::size_of::<GrassInstanceData>() as u64,
            step_mode: VertexStepMode::Instance,
            // Model matrix columns; locations 0-2 carry position/normal/uv.
            attributes: vec![
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 3,
                },
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 16,
                    shader_location: 4,
                },
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 32,
                    shader_location: 5,
                },
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 48,
                    shader_location: 6,
                },
            ],
        });
        if let Some(fragment) = descriptor.fragment.as_mut() {
            fragment.shader = self.shader.clone();
        }
        // Shading uniforms at group 2 (view = 0, mesh = 1).
        descriptor.layout.push(self.shading_layout.clone());
        // Blades are flat ribbons viewed from both sides.
        descriptor.primitive.cull_mode = None;

        Ok(descriptor)
    }
}

type DrawGrassTier = (
    SetItemPipeline,
    SetMeshViewBindGroup<0>,
    SetMeshBindGroup<1>,
    SetGrassShadingBindGroup<2>,
    DrawBladeInstanced,
);

struct SetGrassShadingBindGroup<const I: usize>;

impl<P: PhaseItem, const I: usize> RenderCommand<P> for SetGrassShadingBindGroup<I> {
    type Param = SRes<GrassShadingUniformBuffer>;
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        _item: &P,
        _view: (),
        _entity: Option<()>,
        uniform: SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let Some(bind_group) = uniform.into_inner().bind_group.as_ref() else {
            return RenderCommandResult::Failure;
        };
        pass.set_bind_group(I, bind_group, &[]);
        RenderCommandResult::Success
    }
}

struct DrawBladeInstanced;

impl<P: PhaseItem> RenderCommand<P> for DrawBladeInstanced {
    type Param = (
        SRes<RenderAssets<GpuMesh>>,
        SRes<RenderMeshInstances>,
        SRes<GrassTierBuffers>,
    );
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        item: &P,
        _view: (),
        _entity: Option<()>,
        (meshes, render_mesh_instances, buffers): SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(item.entity())
        else {
            return RenderCommandResult::Failure;
        };
        let Some(gpu_mesh) = meshes.into_inner().get(mesh_instance.mesh_asset_id) else {
            return RenderCommandResult::Failure;
        };
        let Some(tier) = buffers.into_inner().0.get(&item.entity()) else {
            return RenderCommandResult::Failure;
        };
        if tier.length == 0 {
            // Empty tier this frame: nothing to submit.
            return RenderCommandResult::Success;
        }

        pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
        let prefix_bytes = (tier.length * std::mem::size_of::<GrassInstanceData>()) as u64;
        pass.set_vertex_buffer(1, tier.buffer.slice(..prefix_bytes));

        match &gpu_mesh.buffer_info {
            GpuBufferInfo::Indexed {
                buffer,
                index_format,
                count,
            } => {
                pass.set_index_buffer(buffer.slice(..), 0, *index_format);
                pass.draw_indexed(0..*count, 0, 0..tier.length as u32);
            }
            GpuBufferInfo::NonIndexed => {
                pass.draw(0..gpu_mesh.vertex_count, 0..tier.length as u32);
            }
        }
        RenderCommandResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_respects_capacity() {
        let mut tier = GrassTierInstances::with_capacity(2);
        for _ in 0..5 {
            tier.push(GrassInstanceData::new(Mat4::IDENTITY));
        }
        assert_eq!(tier.active(), 2);
        assert_eq!(tier.capacity(), 2);
    }

    #[test]
    fn clear_retains_capacity() {
        let mut tier = GrassTierInstances::with_capacity(4);
        tier.push(GrassInstanceData::new(Mat4::IDENTITY));
        tier.mark_dirty();
        tier.clear();
        assert_eq!(tier.active(), 0);
        assert_eq!(tier.capacity(), 4);
        assert!(tier.is_dirty());
    }

    #[test]
    fn instance_data_round_trips_the_matrix() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(0.8),
            Quat::from_rotation_y(1.2),
            Vec3::new(3.0, 0.0, -4.0),
        );
        let data = GrassInstanceData::new(m);
        assert_eq!(data.model(), m);
    }
}
