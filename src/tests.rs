use crate::error::ArchiveError;
use crate::interval::*;
use crate::labels::*;
use crate::naming::*;
use std::path::PathBuf;
use tempfile::tempdir;

/// Helper to build a descriptor for the `atmos`/`t_surf` archive
fn descriptor(
    representation: DataRepresentation,
    granularity: Granularity,
    interval: Option<IntervalSpec>,
    duration_years: u32,
    data_year: i32,
) -> ArchiveFileDescriptor {
    ArchiveFileDescriptor {
        variable: "t_surf".to_string(),
        domain: "atmos".to_string(),
        representation,
        granularity,
        interval,
        duration_years,
        data_year,
        archive_start_year: 1,
    }
}

#[cfg(test)]
mod interval_tests {
    use super::*;

    #[test]
    fn test_every_month_resolves() {
        for month in 1..=12u8 {
            let resolved = resolve(&IntervalSpec::Month(month)).unwrap();
            assert_eq!(resolved.label, format!("{:02}", month));
            assert_eq!(resolved.months, vec![month]);
        }
        assert!(matches!(
            resolve(&IntervalSpec::Month(0)),
            Err(ArchiveError::UnresolvedInterval(_))
        ));
        assert!(resolve(&IntervalSpec::Month(13)).is_err());
    }

    #[test]
    fn test_season_codes_resolve_by_code_and_by_months() {
        for (code, months) in SEASONS {
            let by_code = resolve(&IntervalSpec::Season(code.to_string())).unwrap();
            assert_eq!(by_code.label, *code);
            assert_eq!(by_code.months, months.to_vec());

            let by_months = resolve(&IntervalSpec::Months(months.to_vec())).unwrap();
            assert_eq!(by_months.label, *code);
        }
    }

    #[test]
    fn test_month_order_does_not_matter() {
        let resolved = resolve(&IntervalSpec::Months(vec![12, 1, 2])).unwrap();
        assert_eq!(resolved.label, "djf");
        assert_eq!(resolved.months, vec![1, 2, 12]);
        assert!(resolved.contains(12));
        assert!(!resolved.contains(6));
    }

    #[test]
    fn test_annual_forms() {
        let annual = resolve(&IntervalSpec::Annual).unwrap();
        assert_eq!(annual.label, "ann");
        assert_eq!(annual.months, (1..=12).collect::<Vec<u8>>());

        let text = resolve(&IntervalSpec::Season("ANNUAL".to_string())).unwrap();
        assert_eq!(text.label, "ann");
    }

    #[test]
    fn test_unknown_intervals_fail() {
        assert!(matches!(
            resolve(&IntervalSpec::Months(vec![1, 5])),
            Err(ArchiveError::UnresolvedInterval(_))
        ));
        assert!(resolve(&IntervalSpec::Season("xyz".to_string())).is_err());
    }

    #[test]
    fn test_vocabulary_lookups() {
        assert_eq!(season_months("jjas"), Some(&[6u8, 7, 8, 9][..]));
        assert_eq!(season_months("winter"), None);
        assert_eq!(season_for_months(&[2, 1, 12]), Some("djf"));
        assert_eq!(season_for_months(&[1, 3]), None);
    }

    #[test]
    fn test_months_from_letters() {
        assert_eq!(months_from_letters("jjas").unwrap(), vec![6, 7, 8, 9]);
        assert_eq!(months_from_letters("ndjfm").unwrap(), vec![11, 12, 1, 2, 3]);
        assert_eq!(months_from_letters("ann").unwrap().len(), 12);
        assert!(months_from_letters("xyz").is_err());
        assert!(months_from_letters("").is_err());
    }

    #[test]
    fn test_interval_spec_parsing() {
        assert_eq!("7".parse::<IntervalSpec>().unwrap(), IntervalSpec::Month(7));
        assert_eq!(
            "6, 7, 8".parse::<IntervalSpec>().unwrap(),
            IntervalSpec::Months(vec![6, 7, 8])
        );
        assert_eq!(
            "JJA".parse::<IntervalSpec>().unwrap(),
            IntervalSpec::Season("jja".to_string())
        );
        assert_eq!("annual".parse::<IntervalSpec>().unwrap(), IntervalSpec::Annual);
        assert!("".parse::<IntervalSpec>().is_err());
        assert!("6,,8".parse::<IntervalSpec>().is_err());
    }

    #[test]
    fn test_interval_spec_from_config_values() {
        let month: IntervalSpec = serde_json::from_str("7").unwrap();
        assert_eq!(month, IntervalSpec::Month(7));

        let months: IntervalSpec = serde_json::from_str("[6, 7, 8]").unwrap();
        assert_eq!(months, IntervalSpec::Months(vec![6, 7, 8]));

        let season: IntervalSpec = serde_yaml::from_str("djf").unwrap();
        assert_eq!(season, IntervalSpec::Season("djf".to_string()));

        let annual: IntervalSpec = serde_json::from_str("\"ann\"").unwrap();
        assert_eq!(annual, IntervalSpec::Annual);
    }
}

#[cfg(test)]
mod labels_tests {
    use super::*;

    #[test]
    fn test_year_range_label() {
        assert_eq!(year_range_label(1981, 1981).unwrap(), "1981");
        assert_eq!(year_range_label(1981, 2010).unwrap(), "1981-2010");
        assert_eq!(year_range_label(21, 25).unwrap(), "0021-0025");
        assert!(matches!(
            year_range_label(2010, 1981),
            Err(ArchiveError::InvalidRange {
                start: 2010,
                end: 1981
            })
        ));
    }

    #[test]
    fn test_date_range_contains() {
        let range = DateRange::new(1981, 2010).unwrap();
        assert!(range.contains(1981));
        assert!(range.contains(2010));
        assert!(!range.contains(2011));
        assert_eq!(range.to_string(), "1981-2010");
    }

    #[test]
    fn test_date_range_from_config_values() {
        let range: DateRange = serde_json::from_str("[21, 30]").unwrap();
        assert_eq!((range.start(), range.end()), (21, 30));
        assert!(serde_json::from_str::<DateRange>("[30, 21]").is_err());
    }

    #[test]
    fn test_ensemble_label() {
        assert_eq!(ensemble_label(None), "");
        assert_eq!(ensemble_label(Some(&EnsembleMember::Average)), "ens_mean");
        assert_eq!(ensemble_label(Some(&EnsembleMember::Index(0))), "mem1");
        assert_eq!(ensemble_label(Some(&EnsembleMember::Index(4))), "mem5");
    }

    #[test]
    fn test_ensemble_member_parsing() {
        assert_eq!("avg".parse::<EnsembleMember>().unwrap(), EnsembleMember::Average);
        assert_eq!("2".parse::<EnsembleMember>().unwrap(), EnsembleMember::Index(2));
        assert!("mean".parse::<EnsembleMember>().is_err());

        let from_int: EnsembleMember = serde_json::from_str("3").unwrap();
        assert_eq!(from_int, EnsembleMember::Index(3));
        let from_text: EnsembleMember = serde_yaml::from_str("avg").unwrap();
        assert_eq!(from_text, EnsembleMember::Average);
    }

    #[test]
    fn test_zonal_mean_label() {
        assert_eq!(zonal_mean_label(Some(true)), "znl");
        assert_eq!(zonal_mean_label(Some(false)), "");
        assert_eq!(zonal_mean_label(None), "");
    }

    #[test]
    fn test_var_label() {
        assert_eq!(var_label("temp", true, Some("500")), "temp.500");
        assert_eq!(var_label("temp", false, Some("500")), "temp");
        assert_eq!(var_label("temp", false, Some("sigma")), "temp.sigma");
        assert_eq!(var_label("temp", true, None), "temp");
    }

    #[test]
    fn test_data_in_label() {
        assert_eq!(data_in_label("monthly", "ts", None), "from_monthly_ts");
        assert_eq!(data_in_label("jja", "av", Some("pressure")), "from_jja_av_pressure");
        // Missing components leave no stray separators
        assert_eq!(data_in_label("", "ts", Some("")), "from_ts");
        assert_eq!(data_in_label("_monthly_", "ts", None), "from_monthly_ts");
    }

    #[test]
    fn test_data_out_label() {
        assert_eq!(
            data_out_label(&IntervalSpec::Season("jja".to_string()), "ts", Some("pressure"))
                .unwrap(),
            "jja.ts.pressure"
        );
        assert_eq!(data_out_label(&IntervalSpec::Annual, "av", None).unwrap(), "ann.av");
        assert_eq!(
            data_out_label(&IntervalSpec::Month(7), "", None).unwrap(),
            "07"
        );
        assert!(data_out_label(&IntervalSpec::Months(vec![1, 5]), "ts", None).is_err());
    }

    #[test]
    fn test_provenance_separators_collapse() {
        assert_eq!(provenance_label(Provenance::Output, "jja", "", Some("")), "jja");
        assert_eq!(provenance_label(Provenance::Output, "a..b", "ts", None), "a.b.ts");
        assert_eq!(provenance_label(Provenance::Input, "", "", None), "from");
    }
}

#[cfg(test)]
mod naming_tests {
    use super::*;
    use DataRepresentation::*;

    #[test]
    fn test_annual_time_series() {
        let one_year = descriptor(TimeSeries, Granularity::Annual, None, 1, 23);
        assert_eq!(build_name(&one_year).unwrap(), "atmos.0023.t_surf.nc");

        for year in 21..=25 {
            let five_years = descriptor(TimeSeries, Granularity::Annual, None, 5, year);
            assert_eq!(build_name(&five_years).unwrap(), "atmos.0021-0025.t_surf.nc");
        }
        let next = descriptor(TimeSeries, Granularity::Annual, None, 5, 26);
        assert_eq!(build_name(&next).unwrap(), "atmos.0026-0030.t_surf.nc");
    }

    #[test]
    fn test_sub_annual_time_series() {
        let monthly = descriptor(TimeSeries, Granularity::Monthly, None, 5, 23);
        assert_eq!(build_name(&monthly).unwrap(), "atmos.002101-002512.t_surf.nc");

        let daily = descriptor(TimeSeries, Granularity::Daily, None, 5, 23);
        assert_eq!(build_name(&daily).unwrap(), "atmos.00210101-00251231.t_surf.nc");

        let three_hourly =
            descriptor(TimeSeries, Granularity::SubDaily("3hr".to_string()), None, 5, 23);
        assert_eq!(
            build_name(&three_hourly).unwrap(),
            "atmos.0021010100-0025123123.t_surf.nc"
        );
    }

    #[test]
    fn test_instantaneous_named_like_time_series() {
        let inst = descriptor(Instantaneous, Granularity::Monthly, None, 5, 23);
        let ts = descriptor(TimeSeries, Granularity::Monthly, None, 5, 23);
        assert_eq!(build_name(&inst).unwrap(), build_name(&ts).unwrap());
    }

    #[test]
    fn test_averaged() {
        let annual = descriptor(Averaged, Granularity::Annual, None, 5, 23);
        assert_eq!(build_name(&annual).unwrap(), "atmos.0021-0025.ann.nc");

        let single = descriptor(Averaged, Granularity::Annual, None, 1, 23);
        assert_eq!(build_name(&single).unwrap(), "atmos.0023.ann.nc");

        let summer = descriptor(
            Averaged,
            Granularity::Monthly,
            Some(IntervalSpec::Season("jja".to_string())),
            5,
            23,
        );
        assert_eq!(build_name(&summer).unwrap(), "atmos.0021-0025.jja.nc");

        let january = descriptor(Averaged, Granularity::Monthly, Some(IntervalSpec::Month(1)), 5, 23);
        assert_eq!(build_name(&january).unwrap(), "atmos.0021-0025.01.nc");

        let winter = descriptor(
            Averaged,
            Granularity::Monthly,
            Some(IntervalSpec::Months(vec![12, 1, 2])),
            10,
            23,
        );
        assert_eq!(build_name(&winter).unwrap(), "atmos.0021-0030.djf.nc");
    }

    #[test]
    fn test_averaged_time_series_always_uses_span() {
        let one_year = descriptor(AveragedTimeSeries, Granularity::Monthly, None, 1, 23);
        assert_eq!(build_name(&one_year).unwrap(), "atmos.0023-0023.01-12.nc");

        let five_years = descriptor(AveragedTimeSeries, Granularity::Annual, None, 5, 23);
        assert_eq!(build_name(&five_years).unwrap(), "atmos.0021-0025.01-12.nc");
    }

    #[test]
    fn test_unsupported_combinations() {
        let jja = Some(IntervalSpec::Season("jja".to_string()));
        let cases = vec![
            descriptor(TimeSeries, Granularity::Seasonal, None, 5, 23),
            descriptor(Averaged, Granularity::Seasonal, jja.clone(), 5, 23),
            descriptor(Averaged, Granularity::Daily, jja.clone(), 5, 23),
            descriptor(Averaged, Granularity::SubDaily("6hr".to_string()), jja, 5, 23),
            descriptor(Averaged, Granularity::Monthly, None, 5, 23),
        ];
        for case in cases {
            assert!(
                matches!(
                    build_name(&case),
                    Err(ArchiveError::UnsupportedRepresentation { .. })
                ),
                "{:?} should have no name",
                case
            );
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let zero = descriptor(TimeSeries, Granularity::Annual, None, 0, 23);
        assert!(matches!(build_name(&zero), Err(ArchiveError::InvalidDuration(0))));

        let unlabelled = descriptor(
            Averaged,
            Granularity::Monthly,
            Some(IntervalSpec::Months(vec![1, 5])),
            5,
            23,
        );
        assert!(matches!(
            build_name(&unlabelled),
            Err(ArchiveError::UnresolvedInterval(_))
        ));
    }

    #[test]
    fn test_block_alignment_invariants() {
        for duration in 1..=10u32 {
            for start in [-3, 0, 1, 1979] {
                for year in start - 12..start + 40 {
                    let block = archive_block(year, start, duration).unwrap();
                    assert!(block.start_year <= year && year <= block.end_year);
                    assert_eq!(block.end_year - block.start_year + 1, duration as i32);
                    assert_eq!((block.start_year - start).rem_euclid(duration as i32), 0);
                }
            }
        }
    }

    #[test]
    fn test_block_before_archive_start() {
        let block = archive_block(1979, 1980, 5).unwrap();
        assert_eq!((block.start_year, block.end_year), (1975, 1979));
        assert_eq!(block.label(), "1975-1979");
        assert!(archive_block(1979, 1980, 0).is_err());
    }

    #[test]
    fn test_block_rejects_oversized_durations() {
        for duration in [u32::MAX, 3_000_000_000, i32::MAX as u32 + 1] {
            assert!(matches!(
                archive_block(21, 1, duration),
                Err(ArchiveError::InvalidDuration(d)) if d == duration
            ));
        }

        // Block end past i32::MAX
        assert!(matches!(
            archive_block(21, 21, i32::MAX as u32),
            Err(ArchiveError::InvalidDuration(_))
        ));
        let block = archive_block(21, 1, i32::MAX as u32).unwrap();
        assert_eq!((block.start_year, block.end_year), (1, i32::MAX));
    }

    #[test]
    fn test_build_names_over_range() {
        let monthly = descriptor(TimeSeries, Granularity::Monthly, None, 5, 21);
        assert_eq!(
            build_names(&monthly, 23, 32).unwrap(),
            vec![
                "atmos.002101-002512.t_surf.nc",
                "atmos.002601-003012.t_surf.nc",
                "atmos.003101-003512.t_surf.nc",
            ]
        );
        assert_eq!(build_names(&monthly, 23, 23).unwrap().len(), 1);
        assert!(matches!(
            build_names(&monthly, 30, 21),
            Err(ArchiveError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_archive_layout() {
        let layout = ArchiveLayout::new("/archive/pp");
        let monthly = descriptor(TimeSeries, Granularity::Monthly, None, 5, 23);
        assert_eq!(
            layout.path_for(&monthly).unwrap(),
            PathBuf::from("/archive/pp/atmos/ts/monthly/5yr/atmos.002101-002512.t_surf.nc")
        );

        let inst = descriptor(Instantaneous, Granularity::Daily, None, 1, 23);
        assert_eq!(
            layout.directory_for(&inst),
            PathBuf::from("/archive/pp/atmos/ts/daily/1yr")
        );

        let av_ts = descriptor(AveragedTimeSeries, Granularity::Annual, None, 5, 23);
        assert_eq!(
            layout.path_for(&av_ts).unwrap(),
            PathBuf::from("/archive/pp/atmos/av/annual/5yr/atmos.0021-0025.01-12.nc")
        );

        assert_eq!(layout.paths_for_years(&monthly, 21, 40).unwrap().len(), 4);
    }

    #[test]
    fn test_representation_and_granularity_parsing() {
        assert_eq!("ts".parse::<DataRepresentation>().unwrap(), TimeSeries);
        assert_eq!("av-ts".parse::<DataRepresentation>().unwrap(), AveragedTimeSeries);
        assert!("median".parse::<DataRepresentation>().is_err());

        assert_eq!("mon".parse::<Granularity>().unwrap(), Granularity::Monthly);
        assert_eq!(
            "6HR".parse::<Granularity>().unwrap(),
            Granularity::SubDaily("6hr".to_string())
        );
        assert!("weekly".parse::<Granularity>().is_err());

        let representation: DataRepresentation = serde_json::from_str("\"inst\"").unwrap();
        assert_eq!(representation, Instantaneous);
        assert_eq!(serde_json::to_string(&AveragedTimeSeries).unwrap(), "\"av_ts\"");
    }
}

#[cfg(test)]
mod select_tests {
    use crate::calendar::{CfDatetime, CfDecoder, DecodeError, TimeDecoder};
    use crate::error::ArchiveError;
    use crate::select::*;
    use chrono::NaiveDate;

    /// First day of every month from 1980 to 1982
    fn monthly_axis() -> Vec<NaiveDate> {
        (1980..=1982)
            .flat_map(|year| (1..=12).map(move |month| NaiveDate::from_ymd_opt(year, month, 1).unwrap()))
            .collect()
    }

    #[test]
    fn test_mask_only() {
        let axis = monthly_axis();
        let query = TimeAxisQuery::new(1981, 1981, vec![6, 7, 8], SelectMode::MaskOnly).unwrap();
        let selection = select(&axis, &query);

        let mask = selection.mask().unwrap();
        assert_eq!(mask.len(), axis.len());
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.indices().unwrap(), vec![17, 18, 19]);
        assert!(selection.values().is_none());
    }

    #[test]
    fn test_values_only() {
        let axis = monthly_axis();
        let query = TimeAxisQuery::new(1980, 1982, vec![12], SelectMode::ValuesOnly).unwrap();
        let selection = select(&axis, &query);

        let values = selection.values().unwrap();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|d| d.format("%m").to_string() == "12"));
        assert!(selection.indices().is_none());
    }

    #[test]
    fn test_mask_and_values() {
        let axis = monthly_axis();
        let query = TimeAxisQuery::new(1982, 1982, vec![1, 2], SelectMode::MaskAndValues).unwrap();
        let selection = select(&axis, &query);

        assert_eq!(selection.indices().unwrap(), vec![24, 25]);
        assert_eq!(
            selection.values().unwrap(),
            &[
                NaiveDate::from_ymd_opt(1982, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(1982, 2, 1).unwrap()
            ]
        );
    }

    #[test]
    fn test_empty_selection_is_not_an_error() {
        let axis = monthly_axis();
        let query = TimeAxisQuery::new(1990, 1999, vec![1], SelectMode::MaskAndValues).unwrap();
        let selection = select(&axis, &query);
        assert!(selection.is_empty());
        assert_eq!(selection.mask().unwrap().len(), axis.len());
        assert!(selection.mask().unwrap().iter().all(|keep| !keep));

        let no_months = TimeAxisQuery::new(1980, 1982, vec![], SelectMode::MaskOnly).unwrap();
        assert!(select(&axis, &no_months).is_empty());

        let empty_axis: Vec<NaiveDate> = Vec::new();
        assert!(select(&empty_axis, &query).is_empty());
    }

    #[test]
    fn test_query_rejects_reversed_years() {
        assert!(matches!(
            TimeAxisQuery::new(2010, 1981, vec![1], SelectMode::MaskOnly),
            Err(ArchiveError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_select_mode_parsing() {
        assert_eq!("mask".parse::<SelectMode>().unwrap(), SelectMode::MaskOnly);
        assert_eq!("both".parse::<SelectMode>().unwrap(), SelectMode::MaskAndValues);
        assert_eq!("values-only".parse::<SelectMode>().unwrap(), SelectMode::ValuesOnly);
        assert!("all".parse::<SelectMode>().is_err());
    }

    #[test]
    fn test_select_numeric_noleap() {
        // Month starts in years 1 and 2 of a 365-day calendar
        let values = [0.0, 31.0, 59.0, 151.0, 181.0, 212.0, 365.0, 516.0];
        let query = TimeAxisQuery::new(1, 1, vec![6, 7, 8], SelectMode::MaskAndValues).unwrap();
        let selection = select_numeric(
            &values,
            "days since 0001-01-01 00:00:00",
            "noleap",
            &query,
            &CfDecoder,
        )
        .unwrap();

        assert_eq!(selection.indices().unwrap(), vec![3, 4, 5]);
        assert_eq!(selection.values().unwrap(), &[151.0, 181.0, 212.0]);
    }

    #[test]
    fn test_select_numeric_decode_errors() {
        let query = TimeAxisQuery::new(1, 1, vec![1], SelectMode::MaskOnly).unwrap();

        let bad_units = select_numeric(&[0.0], "furlongs since 2000-01-01", "standard", &query, &CfDecoder);
        assert!(matches!(
            bad_units,
            Err(ArchiveError::Decode(DecodeError::UnsupportedUnit(_)))
        ));

        let bad_calendar = select_numeric(&[0.0], "days since 2000-01-01", "lunar", &query, &CfDecoder);
        assert!(matches!(
            bad_calendar,
            Err(ArchiveError::Decode(DecodeError::UnknownCalendar(_)))
        ));

        let nan = select_numeric(&[0.0, f64::NAN], "days since 2000-01-01", "standard", &query, &CfDecoder);
        assert!(matches!(
            nan,
            Err(ArchiveError::Decode(DecodeError::NonFiniteValue { index: 1 }))
        ));
    }

    /// Decoder returning a fixed axis, standing in for an external library
    struct FixedDecoder(Vec<CfDatetime>);

    impl TimeDecoder for FixedDecoder {
        fn decode(&self, values: &[f64], _units: &str, _calendar: &str) -> Result<Vec<CfDatetime>, DecodeError> {
            Ok(self.0.iter().take(values.len()).copied().collect())
        }
    }

    #[test]
    fn test_select_numeric_with_injected_decoder() {
        let decoder = FixedDecoder(vec![
            CfDatetime::ymd(2000, 2, 30),
            CfDatetime::ymd(2000, 3, 1),
            CfDatetime::ymd(2001, 2, 30),
        ]);
        let query = TimeAxisQuery::new(2000, 2000, vec![2], SelectMode::ValuesOnly).unwrap();
        let selection =
            select_numeric(&[10.0, 20.0, 30.0], "ignored", "360_day", &query, &decoder).unwrap();
        assert_eq!(selection.values().unwrap(), &[10.0]);
    }

    #[test]
    fn test_select_between_dates() {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let axis: Vec<NaiveDate> = start.iter_days().take(365).collect();

        let selection = select_between(
            &axis,
            CfDatetime::ymd(1981, 6, 15),
            CfDatetime::ymd(1981, 8, 15),
            &[6, 7, 8],
            SelectMode::MaskOnly,
        )
        .unwrap();
        assert_eq!(selection.len(), 16 + 31 + 15);

        let july_only = select_between(
            &axis,
            CfDatetime::ymd(1981, 6, 15),
            CfDatetime::ymd(1981, 8, 15),
            &[7],
            SelectMode::ValuesOnly,
        )
        .unwrap();
        assert_eq!(july_only.len(), 31);

        assert!(
            select_between(
                &axis,
                CfDatetime::ymd(1981, 8, 15),
                CfDatetime::ymd(1981, 6, 15),
                &[7],
                SelectMode::MaskOnly,
            )
            .is_err()
        );
    }
}

#[cfg(test)]
mod dataset_tests {
    use super::*;
    use crate::calendar::{CfDatetime, CfDecoder};
    use crate::dataset::*;
    use crate::select::{SelectMode, TimeAxisQuery};

    /// Writes a small file with a time axis and a (time, lat, lon) variable
    fn write_sample(path: &std::path::Path, calendar: Option<&str>) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        file.add_dimension("time", 4)?;
        file.add_dimension("lat", 2)?;
        file.add_dimension("lon", 3)?;

        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_values(&[0.0, 31.0, 59.0, 90.0], ..)?;
        time.put_attribute("units", "days since 2000-01-01 00:00:00")?;
        if let Some(calendar) = calendar {
            time.put_attribute("calendar", calendar)?;
        }

        let mut t_surf = file.add_variable::<f64>("t_surf", &["time", "lat", "lon"])?;
        t_surf.put_values(&vec![280.0; 24], ..)?;

        let mut zonal = file.add_variable::<f64>("u_znl", &["time", "lat"])?;
        zonal.put_values(&vec![1.0; 8], ..)?;

        file.add_variable::<f64>("no_units", &["time"])?;
        Ok(())
    }

    #[test]
    fn test_read_time_axis() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("atmos.200001-200012.t_surf.nc");
        write_sample(&path, Some("noleap"))?;

        let axis = read_time_axis(&path, "time")?;
        assert_eq!(axis.values, vec![0.0, 31.0, 59.0, 90.0]);
        assert_eq!(axis.units, "days since 2000-01-01 00:00:00");
        assert_eq!(axis.calendar, "noleap");

        let dates = axis.decode(&CfDecoder)?;
        assert_eq!(dates[3], CfDatetime::ymd(2000, 4, 1));
        Ok(())
    }

    #[test]
    fn test_default_calendar() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sample.nc");
        write_sample(&path, None)?;

        let axis = read_time_axis(&path, "time")?;
        assert_eq!(axis.calendar, DEFAULT_CALENDAR);
        Ok(())
    }

    #[test]
    fn test_select_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sample.nc");
        write_sample(&path, Some("standard"))?;

        let axis = read_time_axis(&path, "time")?;
        let query = TimeAxisQuery::new(2000, 2000, vec![2, 3], SelectMode::MaskAndValues)?;
        let selection = axis.select(&query, &CfDecoder)?;
        // 2000 is a leap year: day 59 is 29 February, day 90 is 31 March
        assert_eq!(selection.indices().unwrap(), vec![1, 2, 3]);
        assert_eq!(selection.values().unwrap(), &[31.0, 59.0, 90.0]);
        Ok(())
    }

    #[test]
    fn test_missing_variable_and_units() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sample.nc");
        write_sample(&path, None)?;

        assert!(matches!(
            read_time_axis(&path, "Time"),
            Err(ArchiveError::MissingVariable(_))
        ));
        assert!(matches!(
            read_time_axis(&path, "no_units"),
            Err(ArchiveError::MissingAttribute { .. })
        ));
        assert!(matches!(
            read_time_axis(dir.path().join("absent.nc"), "time"),
            Err(ArchiveError::Netcdf(_))
        ));
        Ok(())
    }

    #[test]
    fn test_longitude_detection() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sample.nc");
        write_sample(&path, None)?;

        assert_eq!(variable_dimensions(&path, "t_surf")?, vec!["time", "lat", "lon"]);
        assert!(has_longitude(&path, "t_surf")?);
        assert!(!has_longitude(&path, "u_znl")?);
        assert_eq!(zonal_mean_label(Some(has_longitude(&path, "u_znl")?)), "");
        Ok(())
    }
}

#[cfg(test)]
mod input_tests {
    use super::*;
    use crate::input::*;
    use crate::staging::StagingKind;
    use std::fs;

    const YAML: &str = r#"
run:
  name: test_am2
  root: /archive/pp
  duration: 5
  start_year: 1
  default_years: [21, 80]
variable: t_surf
domain: atmos
representation: av
granularity: monthly
interval: jja
ensemble_member: avg
staging:
  backend: hsmget
  workdir: /work/user
  ptmpdir: /ptmp/user
"#;

    #[test]
    fn test_job_config_from_yaml() {
        let config = JobConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.run.name, "test_am2");
        assert_eq!(config.run.duration, 5);
        assert_eq!(config.representation, DataRepresentation::Averaged);
        assert_eq!(config.granularity, Granularity::Monthly);
        assert_eq!(config.interval, Some(IntervalSpec::Season("jja".to_string())));
        assert_eq!(config.ensemble_member, Some(EnsembleMember::Average));
        assert_eq!(config.staging.backend, StagingKind::Hsmget);
        assert_eq!(config.staging.workdir, Some(PathBuf::from("/work/user")));
    }

    #[test]
    fn test_job_config_from_json() {
        let json = r#"
        {
            "run": {"name": "cm2", "root": "/archive/pp", "duration": 1, "start_year": 1861},
            "variable": "precip",
            "domain": "atmos",
            "representation": "ts",
            "granularity": "daily",
            "years": [1861, 1862]
        }"#;

        let config = JobConfig::from_json(json).unwrap();
        assert_eq!(config.interval, None);
        assert_eq!(config.staging.backend, StagingKind::Local);
        assert_eq!(
            config.files().unwrap(),
            vec![
                PathBuf::from("/archive/pp/atmos/ts/daily/1yr/atmos.18610101-18611231.precip.nc"),
                PathBuf::from("/archive/pp/atmos/ts/daily/1yr/atmos.18620101-18621231.precip.nc"),
            ]
        );
    }

    #[test]
    fn test_years_fall_back_to_run_default() {
        let mut config = JobConfig::from_yaml(YAML).unwrap();
        let years = config.years().unwrap();
        assert_eq!((years.start(), years.end()), (21, 80));
        assert_eq!(config.files().unwrap().len(), 12);

        config.years = Some(DateRange::new(23, 24).unwrap());
        assert_eq!(
            config.files().unwrap(),
            vec![PathBuf::from("/archive/pp/atmos/av/monthly/5yr/atmos.0021-0025.jja.nc")]
        );

        config.years = None;
        config.run.default_years = None;
        assert!(config.years().is_err());
        assert!(config.files().is_err());
    }

    #[test]
    fn test_descriptor_for_year() {
        let config = JobConfig::from_yaml(YAML).unwrap();
        let descriptor = config.descriptor_for(42);
        assert_eq!(descriptor.data_year, 42);
        assert_eq!(descriptor.archive_start_year, 1);
        assert_eq!(build_name(&descriptor).unwrap(), "atmos.0041-0045.jja.nc");
    }

    #[test]
    fn test_invalid_configs() {
        // Unknown representation
        assert!(JobConfig::from_yaml(&YAML.replace("representation: av", "representation: median")).is_err());
        // Reversed default years
        assert!(JobConfig::from_yaml(&YAML.replace("[21, 80]", "[80, 21]")).is_err());
        // Missing run section
        assert!(JobConfig::from_json(r#"{"variable": "t_surf"}"#).is_err());
    }

    #[test]
    fn test_from_file_picks_parser_by_extension() {
        let dir = tempdir().unwrap();

        let yaml_path = dir.path().join("job.yml");
        fs::write(&yaml_path, YAML).unwrap();
        let from_yaml = JobConfig::from_file(&yaml_path).unwrap();

        let json_path = dir.path().join("job.json");
        fs::write(&json_path, serde_json::to_string(&from_yaml).unwrap()).unwrap();
        let from_json = JobConfig::from_file(&json_path).unwrap();
        assert_eq!(from_yaml, from_json);

        let missing = JobConfig::from_file(dir.path().join("absent.yaml"));
        assert!(missing.unwrap_err().to_string().contains("absent.yaml"));
    }
}

#[cfg(test)]
mod workflow_tests {
    use super::*;
    use crate::input::JobConfig;
    use crate::{locate_archive_files, stage_archive_files};
    use std::fs;

    fn job_rooted_at(root: &std::path::Path) -> JobConfig {
        let yaml = format!(
            r#"
run:
  name: test_am2
  root: {}
  duration: 5
  start_year: 1
variable: t_surf
domain: atmos
representation: ts
granularity: monthly
years: [21, 30]
"#,
            root.display()
        );
        JobConfig::from_yaml(&yaml).unwrap()
    }

    #[test]
    fn test_locate_archive_files() {
        let config = job_rooted_at(std::path::Path::new("/archive/pp"));
        let files = locate_archive_files(&config).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/archive/pp/atmos/ts/monthly/5yr/atmos.002101-002512.t_surf.nc"),
                PathBuf::from("/archive/pp/atmos/ts/monthly/5yr/atmos.002601-003012.t_surf.nc"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stage_local_archive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = job_rooted_at(dir.path());

        // Nothing on disk yet
        assert!(stage_archive_files(&config).await.is_err());

        for path in locate_archive_files(&config)? {
            fs::create_dir_all(path.parent().unwrap())?;
            fs::write(&path, b"")?;
        }
        let staged = stage_archive_files(&config).await?;
        assert_eq!(staged.len(), 2);
        assert!(staged.iter().all(|p| p.exists()));
        Ok(())
    }
}
