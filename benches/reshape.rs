use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array3;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use fluid_vtk::{AxisOrder, GridSpec, ScalarField};

fn reshape(grid: &GridSpec, values: Vec<f64>) -> ScalarField {
    ScalarField::from_declared("density", values, grid).unwrap()
}

fn random_values(n: usize) -> Vec<f64> {
    let array: Array3<f64> = Array3::random((n, n, n), Uniform::new(1000., 1030.));
    array.into_raw_vec()
}

fn reshape_bench(c: &mut Criterion) {
    for n in [64, 128] {
        let values = random_values(n);

        let zyx = GridSpec::new([n, n, n], [0.1; 3], [0.0; 3], AxisOrder::ZYX).unwrap();
        c.bench_function(&format!("reshape zyx {}", n), |b| {
            b.iter(|| reshape(&zyx, black_box(values.clone())))
        });

        let xyz = GridSpec::new([n, n, n], [0.1; 3], [0.0; 3], AxisOrder::XYZ).unwrap();
        c.bench_function(&format!("reshape xyz {}", n), |b| {
            b.iter(|| reshape(&xyz, black_box(values.clone())))
        });
    }
}

criterion_group!(benches, reshape_bench);
criterion_main!(benches);
