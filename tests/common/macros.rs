/// Asserts that the number of occupied cells matches the expected value.
#[macro_export]
macro_rules! assert_population {
    ($world:expr, $count:expr) => {
        assert_eq!(
            $world.census().occupied,
            $count,
            "Population count mismatch"
        );
    };
}

/// Asserts that a cell holds an organism.
#[macro_export]
macro_rules! assert_occupied {
    ($world:expr, $cell:expr) => {
        assert!(
            $world
                .lattice
                .cell(tessera_data::CellId($cell))
                .expect("cell out of range")
                .is_occupied(),
            "cell {} should be occupied",
            $cell
        );
    };
}

/// Asserts that a cell is empty.
#[macro_export]
macro_rules! assert_vacant {
    ($world:expr, $cell:expr) => {
        assert!(
            !$world
                .lattice
                .cell(tessera_data::CellId($cell))
                .expect("cell out of range")
                .is_occupied(),
            "cell {} should be empty",
            $cell
        );
    };
}
