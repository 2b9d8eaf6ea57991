//! Halo exchange between boxes.
//!
//! Both fills work from one plan computed from the layout alone, so
//! every worker derives the same list of copies in the same order and
//! the messages of [`exchange_halos`] pair up without tags.

use std::sync::Arc;

use incflow_grid::{BoxLayout, CommError, Communicator, IndexBox, IntVect};

use crate::error::FieldError;
use crate::multi_field::{FieldBox, MultiField};

/// One ghost region of `dst` that mirrors valid cells of `src`.
/// Box numbers are global layout indices.
struct HaloCopy {
    dst: usize,
    src: usize,
    /// Region in destination coordinates.
    region: IndexBox,
    /// Destination minus source coordinates.
    shift: IntVect,
}

fn plan(layout: &BoxLayout, nghost: usize) -> Vec<HaloCopy> {
    let shifts = layout.geometry().periodic_shifts();
    let boxes = layout.boxes();
    let mut copies = Vec::new();
    for (d, dst) in boxes.iter().enumerate() {
        let grown = dst.grow(nghost);
        for (s, src) in boxes.iter().enumerate() {
            for &shift in &shifts {
                if d == s && shift.is_zero() {
                    continue;
                }
                if let Some(region) = grown.intersect(&src.shift(shift)) {
                    copies.push(HaloCopy {
                        dst: d,
                        src: s,
                        region,
                        shift,
                    });
                }
            }
        }
    }
    copies
}

/// Position in `field.boxes()` of each global box, if this worker owns it.
fn local_slots(field: &MultiField) -> Vec<Option<usize>> {
    let mut slots = vec![None; field.layout().len()];
    for (i, b) in field.boxes().iter().enumerate() {
        slots[b.index()] = Some(i);
    }
    slots
}

fn pack(src: &FieldBox, copy: &HaloCopy, ncomp: usize, buf: &mut Vec<f64>) {
    for n in 0..ncomp {
        buf.extend(copy.region.cells().map(|iv| src.get(iv - copy.shift, n)));
    }
}

fn unpack(dst: &mut FieldBox, copy: &HaloCopy, ncomp: usize, values: &mut impl Iterator<Item = f64>) {
    for n in 0..ncomp {
        for iv in copy.region.cells() {
            if let Some(v) = values.next() {
                dst.set(iv, n, v);
            }
        }
    }
}

fn copy_local(field: &mut MultiField, slots: &[Option<usize>], copies: &[HaloCopy]) {
    let ncomp = field.ncomp();
    let local: Vec<(usize, usize, &HaloCopy)> = copies
        .iter()
        .filter_map(|c| Some((slots[c.dst]?, slots[c.src]?, c)))
        .collect();
    let staged: Vec<Vec<f64>> = local
        .iter()
        .map(|&(_, s, c)| {
            let mut buf = Vec::with_capacity(c.region.num_cells() * ncomp);
            pack(&field.boxes()[s], c, ncomp, &mut buf);
            buf
        })
        .collect();
    let boxes = field.boxes_mut();
    for (&(d, _, c), buf) in local.iter().zip(staged) {
        unpack(&mut boxes[d], c, ncomp, &mut buf.into_iter());
    }
}

/// Fill ghost cells of every local box from the valid cells of local
/// boxes, periodic images included.
///
/// Ghost cells with no local source (physical boundaries, boxes owned
/// by other workers) are left untouched. Use [`exchange_halos`] when
/// the layout is spread over several workers.
pub fn fill_boundary(field: &mut MultiField) {
    let layout = Arc::clone(field.layout());
    let slots = local_slots(field);
    let copies = plan(&layout, field.nghost());
    copy_local(field, &slots, &copies);
}

/// Fill ghost cells of every local box from the valid cells of all
/// boxes, whichever worker owns them.
///
/// Collective: every worker of the layout must call it for the same
/// field, in the same order as its other collectives. Each worker
/// posts one message per peer it feeds, copies its local halos, then
/// receives. Physical-face ghosts are left untouched.
///
/// # Errors
///
/// Fails if `comm` is not the field's worker group, or a peer
/// disconnects or sends a message of the wrong size.
pub fn exchange_halos(field: &mut MultiField, comm: &dyn Communicator) -> Result<(), FieldError> {
    let layout = Arc::clone(field.layout());
    let rank = field.rank();
    if comm.rank() != rank || comm.size() != layout.n_workers() {
        return Err(FieldError::WorkerMismatch {
            field: field.name().to_string(),
            rank,
            workers: layout.n_workers(),
            comm_rank: comm.rank(),
            comm_size: comm.size(),
        });
    }
    let ncomp = field.ncomp();
    let slots = local_slots(field);
    let copies = plan(&layout, field.nghost());

    let mut outgoing = vec![Vec::new(); comm.size()];
    let mut incoming: Vec<Vec<&HaloCopy>> = vec![Vec::new(); comm.size()];
    for c in &copies {
        let (from, to) = (layout.owner(c.src), layout.owner(c.dst));
        if from == rank && to != rank {
            if let Some(s) = slots[c.src] {
                pack(&field.boxes()[s], c, ncomp, &mut outgoing[to]);
            }
        } else if to == rank && from != rank {
            incoming[from].push(c);
        }
    }
    for (peer, buf) in outgoing.into_iter().enumerate() {
        if !buf.is_empty() {
            comm.send(peer, buf)?;
        }
    }

    copy_local(field, &slots, &copies);

    for (peer, list) in incoming.iter().enumerate() {
        if list.is_empty() {
            continue;
        }
        let expected: usize = list.iter().map(|c| c.region.num_cells() * ncomp).sum();
        let buf = comm.recv(peer)?;
        if buf.len() != expected {
            return Err(CommError::MessageSize {
                rank,
                peer,
                expected,
                found: buf.len(),
            }
            .into());
        }
        let mut values = buf.into_iter();
        let boxes = field.boxes_mut();
        for c in list {
            if let Some(d) = slots[c.dst] {
                unpack(&mut boxes[d], c, ncomp, &mut values);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use incflow_grid::{BoxLayout, ChannelComm, Geometry, LocalComm};

    fn filled(n: usize, max_grid: usize, ng: usize) -> MultiField {
        shared(n, max_grid, ng, 1, 0)
    }

    fn shared(n: usize, max_grid: usize, ng: usize, workers: usize, rank: usize) -> MultiField {
        let g = Geometry::periodic_cube(n).unwrap();
        let layout = BoxLayout::chop(g, max_grid)
            .unwrap()
            .distribute(workers)
            .unwrap()
            .into_shared();
        let mut f = MultiField::new(layout, rank, 2, ng, "f").unwrap();
        f.fill(-7.0);
        f.set_valid(|iv, c| (100 * iv.get(0) + 10 * iv.get(1) + iv.get(2)) as f64 + 0.5 * c as f64);
        f
    }

    fn expected(iv: IntVect, n: i32, c: usize) -> f64 {
        let w = |x: i32| x.rem_euclid(n);
        (100 * w(iv.get(0)) + 10 * w(iv.get(1)) + w(iv.get(2))) as f64 + 0.5 * c as f64
    }

    #[test]
    fn periodic_single_box_wraps() {
        let mut f = filled(4, 4, 1);
        fill_boundary(&mut f);
        let b = &f.boxes()[0];
        for iv in b.grown().cells() {
            for c in 0..2 {
                assert_eq!(b.get(iv, c), expected(iv, 4, c), "cell {iv} comp {c}");
            }
        }
    }

    #[test]
    fn multi_box_halos_match_neighbours() {
        let mut f = filled(6, 3, 2);
        fill_boundary(&mut f);
        for b in f.boxes() {
            for iv in b.grown().cells() {
                assert_eq!(b.get(iv, 1), expected(iv, 6, 1), "box {} cell {iv}", b.index());
            }
        }
    }

    #[test]
    fn non_periodic_faces_are_left_alone() {
        let domain = IndexBox::from_extent([4, 4, 4]).unwrap();
        let g = Geometry::new(domain, [0.0; 3], [1.0; 3], [false, true, true]).unwrap();
        let layout = BoxLayout::chop(g, 2).unwrap().into_shared();
        let mut f = MultiField::new(layout, 0, 1, 1, "f").unwrap();
        f.fill(-1.0);
        f.set_valid(|_, _| 1.0);
        fill_boundary(&mut f);
        for b in f.boxes() {
            for iv in b.grown().cells() {
                let outside_x = iv.get(0) < 0 || iv.get(0) > 3;
                let want = if outside_x { -1.0 } else { 1.0 };
                assert_eq!(b.get(iv, 0), want, "cell {iv}");
            }
        }
    }

    #[test]
    fn exchange_on_one_worker_matches_local_fill() {
        let mut a = filled(6, 3, 2);
        let mut b = a.clone();
        fill_boundary(&mut a);
        exchange_halos(&mut b, &LocalComm).unwrap();
        for (x, y) in a.boxes().iter().zip(b.boxes()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn exchange_across_workers_fills_every_ghost() {
        let fields: Vec<MultiField> = std::thread::scope(|s| {
            let handles: Vec<_> = ChannelComm::group(3)
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let mut f = shared(6, 2, 2, 3, comm.rank());
                        exchange_halos(&mut f, &comm).unwrap();
                        // a second exchange reuses the same links
                        exchange_halos(&mut f, &comm).unwrap();
                        f
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for f in &fields {
            assert_eq!(f.boxes().len(), 9);
            for b in f.boxes() {
                for iv in b.grown().cells() {
                    for c in 0..2 {
                        assert_eq!(b.get(iv, c), expected(iv, 6, c), "rank {} cell {iv}", f.rank());
                    }
                }
            }
        }
    }

    #[test]
    fn local_fill_leaves_remote_ghosts_alone() {
        let mut f = shared(4, 2, 1, 2, 0);
        fill_boundary(&mut f);
        let stale = f
            .boxes()
            .iter()
            .flat_map(|b| b.grown().cells().map(move |iv| b.get(iv, 0)))
            .filter(|&v| v == -7.0)
            .count();
        assert!(stale > 0);
    }

    #[test]
    fn exchange_rejects_a_foreign_group() {
        let mut f = shared(4, 2, 1, 2, 1);
        let err = exchange_halos(&mut f, &LocalComm).unwrap_err();
        assert!(matches!(
            err,
            FieldError::WorkerMismatch {
                rank: 1,
                workers: 2,
                comm_size: 1,
                ..
            }
        ));
    }
}
