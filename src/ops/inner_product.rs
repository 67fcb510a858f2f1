//! Inner-product matrix over two lists of snapshot paths.
//!
//! Rows are split across workers. Each worker keeps a chunk of row fields in
//! memory and streams the column fields past it one at a time, so at most
//! `fields_per_worker` fields are resident per worker.

use super::field::{Field, InnerProduct};
use crate::error::{BpodError, Result};
use crate::io::FieldStore;
use crate::parallel::{partition, Communicator, Coordinator};
use ndarray::{concatenate, s, Array2, Axis};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// `M[i, j] = <load(row_paths[i]), load(col_paths[j])>`, returned on every worker.
pub fn inner_product_matrix<F, C>(
    coord: &Coordinator<C>,
    store: &dyn FieldStore<F>,
    inner_product: &dyn InnerProduct<F>,
    row_paths: &[PathBuf],
    col_paths: &[PathBuf],
    fields_per_worker: usize,
) -> Result<Array2<f64>>
where
    F: Field,
    C: Communicator,
{
    if row_paths.is_empty() || col_paths.is_empty() {
        return Err(BpodError::Configuration(format!(
            "inner product matrix needs snapshots on both sides, got {} rows and {} columns",
            row_paths.len(),
            col_paths.len()
        )));
    }
    if fields_per_worker < 2 {
        return Err(BpodError::Configuration(format!(
            "need room for at least 2 fields per worker, got {}",
            fields_per_worker
        )));
    }

    let comm = coord.comm();
    let my_rows = partition(row_paths.len(), comm.size())
        .into_iter()
        .nth(comm.rank())
        .unwrap_or(0..0);

    let local = compute_row_block(
        store,
        inner_product,
        &row_paths[my_rows.clone()],
        col_paths,
        fields_per_worker - 1,
    );
    debug!(
        rank = comm.rank(),
        rows = ?my_rows,
        "inner product block finished"
    );

    // 실패한 워커가 있어도 모든 워커가 수집 단계에 참여해야 교착이 없다
    let blocks = coord.all_gather(local)?;
    let blocks = blocks.into_iter().collect::<Result<Vec<_>>>()?;
    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(0), &views)
        .map_err(|e| BpodError::shape("inner product blocks", row_paths.len(), e))
}

fn compute_row_block<F: Field>(
    store: &dyn FieldStore<F>,
    inner_product: &dyn InnerProduct<F>,
    row_paths: &[PathBuf],
    col_paths: &[PathBuf],
    chunk_size: usize,
) -> Result<Array2<f64>> {
    let mut block = Array2::zeros((row_paths.len(), col_paths.len()));
    for (chunk_idx, chunk) in row_paths.chunks(chunk_size.max(1)).enumerate() {
        let row_fields = chunk
            .par_iter()
            .map(|p| store.load(p))
            .collect::<Result<Vec<F>>>()?;
        let offset = chunk_idx * chunk_size.max(1);

        for (j, col_path) in col_paths.iter().enumerate() {
            let col_field = store.load(col_path)?;
            let values = row_fields
                .par_iter()
                .map(|row| inner_product.inner(row, &col_field))
                .collect::<Result<Vec<f64>>>()?;
            block
                .slice_mut(s![offset..offset + chunk.len(), j])
                .iter_mut()
                .zip(values)
                .for_each(|(dst, v)| *dst = v);
        }
    }
    Ok(block)
}
