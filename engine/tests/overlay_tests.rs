use engine::{Board, CellState, GridPos, OverlayKind};

/// 9x9 board with an L of filled cells meeting at (4,4): filled along row 4
/// to the right border and along column 4 to the bottom border. The elbow
/// has exactly two open neighbors, left and up.
fn board_with_elbow() -> Board {
    let mut board = Board::new(9, 9, 10.0);
    for c in 4..9 {
        board.set_cell(GridPos::new(4, c), CellState::Filled);
    }
    for r in 4..9 {
        board.set_cell(GridPos::new(r, 4), CellState::Filled);
    }
    board
}

#[test]
fn equal_rays_make_the_horizontal_axis_primary() {
    let mut board = board_with_elbow();
    board.find_partition_lines();

    // left ray: (4,3)..(4,1), up ray: (3,4)..(1,4), both length 3
    assert_eq!(board.overlay(GridPos::new(4, 3)), Some(OverlayKind::Primary));
    assert_eq!(board.overlay(GridPos::new(4, 1)), Some(OverlayKind::Primary));
    assert_eq!(board.overlay(GridPos::new(3, 4)), Some(OverlayKind::Secondary));
    assert_eq!(board.overlay(GridPos::new(1, 4)), Some(OverlayKind::Secondary));
}

#[test]
fn rays_pass_through_obstacles() {
    let mut board = board_with_elbow();
    board.set_cell(GridPos::new(4, 2), CellState::Obstacle);
    let lines = board.find_partition_lines();

    // the obstacle cell is part of the line, and the ray still reaches the
    // left border wall beyond it
    assert!(lines.iter().any(|cell| cell.pos == GridPos::new(4, 2)));
    assert!(lines.iter().any(|cell| cell.pos == GridPos::new(4, 1)));
}

#[test]
fn rerun_clears_stale_overlay() {
    let mut board = board_with_elbow();
    board.find_partition_lines();
    assert!(board.overlay(GridPos::new(4, 3)).is_some());

    // fill the open corner neighbors: the elbow is no longer a two-open
    // corner, so its lines must vanish on the next run
    board.set_cell(GridPos::new(4, 3), CellState::Filled);
    board.set_cell(GridPos::new(3, 4), CellState::Filled);
    board.find_partition_lines();
    assert_eq!(board.overlay(GridPos::new(2, 4)), None);
}

#[test]
fn line_cells_match_persisted_overlay() {
    let mut board = board_with_elbow();
    let lines = board.find_partition_lines();
    assert!(!lines.is_empty());
    for cell in &lines {
        assert_eq!(board.overlay(cell.pos), Some(cell.kind));
    }
    // and nothing outside the reported set carries an overlay
    let line_count = board
        .positions()
        .filter(|&p| board.overlay(p).is_some())
        .count();
    assert_eq!(line_count, lines.len());
}
