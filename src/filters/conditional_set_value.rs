// In: src/filters/conditional_set_value.rs

use crate::arrays::TypedArray;
use crate::containers::{DataArrayPath, DataContainerArray};
use crate::error::Result;
use crate::filter::{
    DataCheck, ExecuteContext, Filter, FilterState, ParameterReader, ParameterWriter,
};
use crate::traits::Element;

/// Overwrites every tuple of the selected array whose boolean mask entry is
/// true with one replacement value. All components of a masked tuple are set.
#[derive(Debug, Clone, Default)]
pub struct ConditionalSetValue {
    pub selected: DataArrayPath,
    pub mask: DataArrayPath,
    pub replace_value: f64,
    state: FilterState,
}

impl ConditionalSetValue {
    pub fn new(selected: DataArrayPath, mask: DataArrayPath, replace_value: f64) -> Self {
        Self {
            selected,
            mask,
            replace_value,
            state: FilterState::default(),
        }
    }
}

impl Filter for ConditionalSetValue {
    fn class_name(&self) -> &'static str {
        "ConditionalSetValue"
    }

    fn human_label(&self) -> &'static str {
        "Replace Value in Array (Conditional)"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        if let Some(target) = check.require_any_array(&self.selected, None) {
            check.check(target.kind.check_range(self.replace_value));
        }
        check.require_array::<bool>(&self.mask, Some(&[1]));
        check.require_same_tuple_count(&[self.selected.clone(), self.mask.clone()]);
    }

    fn compute(&mut self, dca: &mut DataContainerArray, ctx: &mut ExecuteContext<'_>) -> Result<()> {
        // The mask and target may share a matrix, so copy the mask out first.
        let mask = dca.resolve_typed::<bool>(&self.mask)?.as_slice().to_vec();
        let target = dca.resolve_mut(&self.selected)?;
        let value = self.replace_value;
        crate::dispatch_array!(target, array => replace_masked(array, &mask, value, ctx))
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("SelectedArrayPath", self.selected.clone());
        writer.write("ConditionalArrayPath", self.mask.clone());
        writer.write("ReplaceValue", self.replace_value);
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        self.selected = reader.read_path("SelectedArrayPath", self.selected.clone());
        self.mask = reader.read_path("ConditionalArrayPath", self.mask.clone());
        self.replace_value = reader.read_f64("ReplaceValue", self.replace_value);
    }
}

fn replace_masked<T: Element>(
    array: &mut TypedArray<T>,
    mask: &[bool],
    value: f64,
    ctx: &mut ExecuteContext<'_>,
) -> Result<()> {
    let replacement = T::from_f64(value);
    let total = array.num_tuples().min(mask.len());
    let mut replaced = 0usize;
    for (index, &selected) in mask.iter().enumerate().take(total) {
        ctx.checkpoint(index, total)?;
        if selected {
            if let Some(tuple) = array.tuple_mut(index) {
                tuple.fill(replacement);
                replaced += 1;
            }
        }
    }
    log::debug!("replaced {} of {} tuples", replaced, total);
    Ok(())
}
