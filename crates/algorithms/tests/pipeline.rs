//! End-to-end runs of the three operations through the public API.

use geo::polygon;
use geoseries_algorithms::prelude::*;
use geoseries_algorithms::statistics::MannKendallInput;
use geoseries_algorithms::timeseries::timesat_filter_with_progress;
use geoseries_algorithms::vector::PolygonRasterInput;
use geoseries_core::vector::{AttributeValue, Feature, FeatureCollection};
use geoseries_core::ProgressCounter;

const BANDS: usize = 24;

/// 3×3 stack: a rising green-up everywhere, one spiked pixel and one
/// pixel that is mostly cloud (zeros).
fn sample_stack() -> RasterStack<f64> {
    let rising: Vec<f64> = (0..BANDS).map(|b| 60.0 + 4.0 * b as f64).collect();
    let mut stack = RasterStack::new(BANDS, 3, 3);
    stack.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 250.0, -250.0));
    for row in 0..3 {
        for col in 0..3 {
            stack.set_z_profile(row, col, &rising).unwrap();
        }
    }

    let mut spiked = rising.clone();
    spiked[12] = 250.0;
    stack.set_z_profile(1, 1, &spiked).unwrap();

    let mut cloudy = vec![0.0; BANDS];
    cloudy[0] = 80.0;
    cloudy[BANDS - 1] = 120.0;
    stack.set_z_profile(2, 0, &cloudy).unwrap();
    stack
}

#[test]
fn timesat_then_trend() {
    let stack = sample_stack();
    let params = TimesatParams {
        extend_window: false,
        ..Default::default()
    };
    let filtered = timesat_filter(&stack, &params).unwrap();
    assert_eq!(filtered.shape(), stack.shape());
    assert_eq!(filtered.transform(), stack.transform());

    // a straight green-up passes through and the spike is replaced by the line
    let rising = stack.z_profile(0, 1).unwrap();
    assert_eq!(filtered.z_profile(0, 1).unwrap(), rising);
    assert_eq!(filtered.z_profile(1, 1).unwrap(), rising);

    // too sparse to fit
    assert!(filtered.z_profile(2, 0).unwrap().iter().all(|&v| v == 0.0));

    let stats = mann_kendall_statistics(&filtered).unwrap();
    assert!(stats.z.get(0, 0).unwrap() > 0.0);
    assert_eq!(stats.s.get(2, 0).unwrap(), 0.0);
    assert_eq!(stats.z.get(2, 0).unwrap(), 0.0);

    let domain = Domain::Item(ItemDomain::new(["insignificant", "significant"]));
    let params = MannKendallParams {
        rule: SignificanceRule::TwoSided,
        ..Default::default()
    };
    let flags = mann_kendall_significance(&filtered, &domain, &params).unwrap();
    assert_eq!(flags.get(0, 0).unwrap(), 1);
    assert_eq!(flags.get(2, 0).unwrap(), 0);
    assert_eq!(flags.domain(), Some(&domain));
}

#[test]
fn algorithm_trait_entry_points() {
    let stack = sample_stack();

    let timesat = Timesat;
    assert_eq!(timesat.name(), "Timesat");
    let filtered = timesat.execute_default(stack.clone()).unwrap();
    assert_eq!(filtered.bands(), BANDS);

    let test = MannKendallTest;
    let input = MannKendallInput {
        stack,
        domain: Domain::Item(ItemDomain::new(["no", "yes"])),
    };
    let flags = test.execute_default(input).unwrap();
    // the literal positive-probability rule marks every finite score
    assert!(flags.data().iter().all(|&v| v == 1));
}

#[test]
fn rasterize_parcels() {
    let georef = GeoReference::new(20, 20, GeoTransform::new(0.0, 20.0, 1.0, -1.0));
    let mut parcels = FeatureCollection::new(["crop", "area_ha"]);
    parcels
        .push(
            Feature::new(
                1001,
                polygon![(x: 2.0, y: 2.0), (x: 10.0, y: 2.0), (x: 10.0, y: 10.0), (x: 2.0, y: 10.0), (x: 2.0, y: 2.0)],
            ),
            vec!["maize".into(), 6.4.into()],
        )
        .unwrap();
    parcels
        .push(
            Feature::new(
                1002,
                polygon![(x: 12.0, y: 12.0), (x: 18.0, y: 12.0), (x: 15.0, y: 18.0), (x: 12.0, y: 12.0)],
            ),
            vec!["wheat".into(), 1.8.into()],
        )
        .unwrap();

    let progress = ProgressCounter::new();
    let out = geoseries_algorithms::vector::polygon_to_raster_with_progress(
        &parcels,
        &georef,
        &PolygonRasterParams::default(),
        &progress,
    )
    .unwrap();
    assert_eq!(progress.total(), 20);
    assert_eq!(progress.done(), 20);

    let maize = out.key_of(1001).unwrap();
    let wheat = out.key_of(1002).unwrap();
    assert_eq!(out.cell_count(maize), 64);
    assert!(out.cell_count(wheat) > 0);

    // keyed cells whose centre falls inside a parcel carry that parcel's key
    for row in 0..20 {
        for col in 0..20 {
            let key = out.raster.get(row, col).unwrap();
            let (x, y) = georef.pixel_to_coord(col, row);
            if key.is_undefined() {
                continue;
            }
            if let Some((_, owner)) = parcels.coord_to_feature(x, y) {
                assert_eq!(out.key_of(owner.id()), Some(key), "cell ({col}, {row})");
            }
        }
    }

    let record = out.record_at(5, 14).unwrap();
    assert_eq!(record[0], AttributeValue::from("maize"));
    assert_eq!(record[2], AttributeValue::Int(maize as i64));

    let via_trait = PolygonToRaster
        .execute_default(PolygonRasterInput {
            features: parcels,
            georef,
        })
        .unwrap();
    assert_eq!(via_trait.raster.data(), out.raster.data());
}

#[test]
fn cancelled_runs_return_an_error() {
    let progress = ProgressCounter::new();
    progress.cancel();
    let err = timesat_filter_with_progress(&sample_stack(), &TimesatParams::default(), &progress)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
