//! Linear combinations of snapshots, saved one output per requested index.
//!
//! Requested indices are split across workers. Each worker keeps up to
//! `fields_per_worker - 1` output accumulators and streams the input fields
//! past them, so each input is loaded once per chunk of outputs.

use super::field::Field;
use super::template::ModeTemplate;
use crate::error::{BpodError, Result};
use crate::io::FieldStore;
use crate::parallel::{partition, Communicator, Coordinator};
use ndarray::ArrayView2;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Checks that every index names a column of a matrix with `available` columns
/// under `index_origin`, and that no index is repeated.
pub fn validate_indices(indices: &[usize], index_origin: usize, available: usize) -> Result<()> {
    let mut seen = HashSet::with_capacity(indices.len());
    for &index in indices {
        if index < index_origin || index - index_origin >= available {
            return Err(BpodError::InvalidModeIndex {
                index,
                reason: format!(
                    "valid indices are {}..{} with index origin {}",
                    index_origin,
                    index_origin.saturating_add(available),
                    index_origin
                ),
            });
        }
        if !seen.insert(index) {
            return Err(BpodError::InvalidModeIndex {
                index,
                reason: "requested more than once".to_string(),
            });
        }
    }
    Ok(())
}

/// For every `m` in `indices`, saves `sum_k coeffs[k, m - index_origin] * load(input_paths[k])`
/// to `template.path_for(m)`. Returns once every worker has written its share.
pub fn linear_combinations<F, C>(
    coord: &Coordinator<C>,
    store: &dyn FieldStore<F>,
    indices: &[usize],
    template: &ModeTemplate,
    input_paths: &[PathBuf],
    coeffs: ArrayView2<f64>,
    index_origin: usize,
    fields_per_worker: usize,
) -> Result<()>
where
    F: Field,
    C: Communicator,
{
    if input_paths.is_empty() {
        return Err(BpodError::Configuration(
            "linear combination needs at least one input snapshot".into(),
        ));
    }
    if coeffs.nrows() != input_paths.len() {
        return Err(BpodError::shape(
            "coefficient rows vs. input snapshots",
            input_paths.len(),
            coeffs.nrows(),
        ));
    }
    if fields_per_worker < 2 {
        return Err(BpodError::Configuration(format!(
            "need room for at least 2 fields per worker, got {}",
            fields_per_worker
        )));
    }
    validate_indices(indices, index_origin, coeffs.ncols())?;

    let comm = coord.comm();
    let mine = partition(indices.len(), comm.size())
        .into_iter()
        .nth(comm.rank())
        .unwrap_or(0..0);
    let local = build_outputs(
        store,
        &indices[mine],
        template,
        input_paths,
        coeffs,
        index_origin,
        fields_per_worker - 1,
    );

    // 모든 워커의 결과를 모아 같은 성공/실패를 돌려준다 (배리어 역할 겸함)
    coord
        .all_gather(local)?
        .into_iter()
        .collect::<Result<Vec<()>>>()
        .map(|_| ())
}

fn build_outputs<F: Field>(
    store: &dyn FieldStore<F>,
    indices: &[usize],
    template: &ModeTemplate,
    input_paths: &[PathBuf],
    coeffs: ArrayView2<f64>,
    index_origin: usize,
    chunk_size: usize,
) -> Result<()> {
    for chunk in indices.chunks(chunk_size.max(1)) {
        let columns: Vec<usize> = chunk.iter().map(|&m| m - index_origin).collect();
        let mut outputs: Vec<Option<F>> = vec![None; chunk.len()];

        for (k, input_path) in input_paths.iter().enumerate() {
            let input = store.load(input_path)?;
            outputs
                .par_iter_mut()
                .zip(columns.par_iter())
                .try_for_each(|(out, &col)| {
                    let acc = out.get_or_insert_with(|| input.zeros_like());
                    acc.add_scaled(coeffs[[k, col]], &input)
                })?;
        }

        chunk
            .par_iter()
            .zip(outputs.par_iter())
            .try_for_each(|(&m, out)| match out {
                Some(field) => store.save(field, &template.path_for(m)),
                None => Err(BpodError::State(format!("output {} was never built", m))),
            })?;
        debug!(outputs = ?chunk, "linear combinations saved");
    }
    Ok(())
}
