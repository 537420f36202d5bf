//! Control-tag replay into per-frame display lists (spec §4.7).

use std::collections::BTreeMap;

use crate::container::{self, Container, Drawable};
use crate::foundation::core::{CharacterId, ColorTransform, FrameIndex, Matrix, Rectangle};
use crate::foundation::error::VecanimResult;
use crate::records::{self, Filter, PlaceObjectRecord};
use crate::tag::{code, TagReader};

/// One placed instance in a frame's depth-ordered display list (spec §3).
#[derive(Clone, Debug)]
pub struct FrameObject {
    pub character_id: CharacterId,
    pub depth: u16,
    pub drawable: Drawable,
    pub bounds: Rectangle,
    pub matrix: Matrix,
    pub color_transform: Option<ColorTransform>,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
    pub ratio: Option<f64>,
    pub filters: Vec<Filter>,
    pub blend_mode: u8,
    pub start_frame: FrameIndex,
    pub inherited_color_transforms: Vec<ColorTransform>,
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub index: FrameIndex,
    pub label: Option<String>,
    pub bounds: Rectangle,
    pub objects: Vec<FrameObject>,
    pub actions: Vec<Vec<u8>>,
}

#[derive(Debug)]
pub struct Timeline {
    pub bounds: Rectangle,
    pub frames: Vec<Frame>,
}

/// Replays a control-tag stream into a [`Timeline`] (spec §4.7).
pub struct TimelineCompositor;

impl TimelineCompositor {
    pub fn compile(
        container: &Container,
        start: usize,
        end: usize,
        max_extent: i32,
    ) -> VecanimResult<Timeline> {
        let data = container.data();
        let region = &data[start..end];
        let mut reader = TagReader::new(region, container.flags());

        let mut display_list: BTreeMap<u16, FrameObject> = BTreeMap::new();
        let mut frames = Vec::new();
        let mut frame_index = 0u32;
        let mut label: Option<String> = None;
        let mut actions: Vec<Vec<u8>> = Vec::new();
        let mut aggregate = Rectangle::EMPTY;

        while let Some(header) = reader.next_tag()? {
            match header.code {
                code::PLACE_OBJECT => {
                    let mut body = reader.body_reader(&header, container.flags());
                    let record = records::read_place_object_v1(&mut body, header.body_offset + header.body_len)?;
                    Self::apply_place(container, &mut display_list, record, frame_index, &mut aggregate, max_extent)?;
                }
                code::PLACE_OBJECT2 => {
                    let mut body = reader.body_reader(&header, container.flags());
                    let record = records::read_place_object_v2(&mut body)?;
                    Self::apply_place(container, &mut display_list, record, frame_index, &mut aggregate, max_extent)?;
                }
                code::PLACE_OBJECT3 => {
                    let mut body = reader.body_reader(&header, container.flags());
                    let record = records::read_place_object_v3(&mut body)?;
                    Self::apply_place(container, &mut display_list, record, frame_index, &mut aggregate, max_extent)?;
                }
                code::REMOVE_OBJECT => {
                    let mut body = reader.body_reader(&header, container.flags());
                    let _character_id = body.read_u16_le()?;
                    let depth = body.read_u16_le()?;
                    display_list.remove(&depth);
                }
                code::REMOVE_OBJECT2 => {
                    let mut body = reader.body_reader(&header, container.flags());
                    let depth = body.read_u16_le()?;
                    display_list.remove(&depth);
                }
                code::FRAME_LABEL => {
                    let mut body = reader.body_reader(&header, container.flags());
                    label = Some(body.read_cstring()?);
                }
                code::DO_ACTION => {
                    let mut body = reader.body_reader(&header, container.flags());
                    actions.push(body.read_bytes(header.body_len)?);
                }
                code::SHOW_FRAME => {
                    let objects: Vec<FrameObject> = display_list.values().cloned().collect();
                    frames.push(Frame {
                        index: FrameIndex(frame_index),
                        label: label.take(),
                        bounds: aggregate,
                        objects,
                        actions: std::mem::take(&mut actions),
                    });
                    frame_index += 1;
                }
                code::END => break,
                _ => {}
            }
        }

        Ok(Timeline {
            bounds: aggregate,
            frames,
        })
    }

    fn apply_place(
        container: &Container,
        display_list: &mut BTreeMap<u16, FrameObject>,
        record: PlaceObjectRecord,
        frame_index: u32,
        aggregate: &mut Rectangle,
        max_extent: i32,
    ) -> VecanimResult<()> {
        let blend_mode = records::normalize_blend_mode(record.blend_mode);
        let filters = record.filters.clone().unwrap_or_default();

        if !record.is_move {
            let Some(character_id) = record.character_id else {
                return Ok(());
            };
            let Some(drawable) = container.resolve(character_id)? else {
                return Ok(());
            };
            let own_bounds = Self::own_bounds(container, &drawable, record.ratio)?;
            let placement = record.matrix.unwrap_or(Matrix::IDENTITY);
            let matrix = container::effective_matrix(placement, own_bounds);
            let transformed = container::transform_rectangle(matrix, own_bounds);

            if !container::exceeds_max_extent(transformed, max_extent) {
                let widened = aggregate.union(transformed);
                if !container::exceeds_max_extent(widened, max_extent) {
                    *aggregate = widened;
                }
            }

            let object = FrameObject {
                character_id,
                depth: record.depth,
                drawable,
                bounds: transformed,
                matrix,
                color_transform: record.color_transform,
                name: record.name,
                clip_depth: record.clip_depth,
                ratio: record.ratio,
                filters,
                blend_mode,
                start_frame: FrameIndex(frame_index),
                inherited_color_transforms: Vec::new(),
            };
            display_list.insert(record.depth, object);
            return Ok(());
        }

        // Move: update only the fields explicitly present (spec §4.7).
        if let Some(existing) = display_list.get_mut(&record.depth) {
            let character_replaced = record
                .character_id
                .is_some_and(|id| id != existing.character_id);

            if let Some(id) = record.character_id {
                if character_replaced {
                    if let Some(drawable) = container.resolve(id)? {
                        existing.drawable = drawable;
                        existing.character_id = id;
                        existing.start_frame = FrameIndex(frame_index);
                    }
                }
            }
            if record.matrix.is_some() || character_replaced {
                let own_bounds = Self::own_bounds(container, &existing.drawable, record.ratio.or(existing.ratio))?;
                let placement = record.matrix.unwrap_or(existing.matrix);
                existing.matrix = container::effective_matrix(placement, own_bounds);
                existing.bounds = container::transform_rectangle(existing.matrix, own_bounds);
            }
            if record.color_transform.is_some() {
                existing.color_transform = record.color_transform;
            }
            if record.name.is_some() {
                existing.name = record.name;
            }
            if record.clip_depth.is_some() {
                existing.clip_depth = record.clip_depth;
            }
            if record.ratio.is_some() {
                existing.ratio = record.ratio;
            }
            if record.filters.is_some() {
                existing.filters = filters;
            }
            if record.blend_mode.is_some() {
                existing.blend_mode = blend_mode;
            }

            let widened = aggregate.union(existing.bounds);
            if !container::exceeds_max_extent(widened, max_extent) {
                *aggregate = widened;
            }
        }
        Ok(())
    }

    fn own_bounds(container: &Container, drawable: &Drawable, ratio: Option<f64>) -> VecanimResult<Rectangle> {
        if let (Drawable::MorphShape(m), Some(ratio)) = (drawable, ratio) {
            return Ok(m.bounds_at(ratio));
        }
        container.drawable_bounds(drawable)
    }
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
