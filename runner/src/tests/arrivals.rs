use core::module_path;
use function_name::named;

use super::{records, run};

#[test]
#[named]
pub fn idle_until_arrival() {
    run(
        module_path!().split("::").last().unwrap(),
        function_name!(),
        &records(&[("A", 2, 3)]),
    );
}

#[test]
#[named]
pub fn late_arrival_overtakes() {
    run(
        module_path!().split("::").last().unwrap(),
        function_name!(),
        &records(&[("A", 0, 30), ("B", 5, 10)]),
    );
}
