//! Configuration validation tests

use automapper::{
    CamelCaseNamingConvention, ConvertUsing, Mapper, MappingError, PascalCaseNamingConvention,
    Profile, TypeClass, member,
};
use serde_json::json;

fn person() -> TypeClass {
    TypeClass::new("Person", || json!({"name": null, "birthYear": null}))
}

fn person_dto() -> TypeClass {
    TypeClass::new("PersonDto", || json!({"name": null, "age": null}))
}

mod strict_tests {
    use super::*;

    #[test]
    fn test_untyped_mapping_fails_in_strict_mode() {
        let mut mapper = Mapper::new();
        mapper.create_map("a", "b");

        let err = mapper.assert_configuration_is_valid(true).unwrap_err();
        assert!(matches!(err, MappingError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Mapping 'ab' cannot be validated, since mapping.sourceType or mapping.destinationType are unspecified."
        );
    }

    #[test]
    fn test_untyped_mapping_skipped_when_lenient() {
        let mut mapper = Mapper::new();
        mapper.create_map("a", "b");
        assert!(mapper.assert_configuration_is_valid(false).is_ok());
    }

    #[test]
    fn test_converted_mapping_is_skipped() {
        let mut mapper = Mapper::new();
        mapper
            .create_map("a", "b")
            .convert_using(ConvertUsing::function(|context| context.source_value.clone()))
            .unwrap();
        assert!(mapper.assert_configuration_is_valid(true).is_ok());
    }
}

mod symmetry_tests {
    use super::*;

    #[test]
    fn test_unmatched_members_reported() {
        let mut mapper = Mapper::new();
        mapper.create_map(person(), person_dto());

        let err = mapper.assert_configuration_is_valid(true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mapping 'Person=>`PersonDto`' is invalid: source member has no counterpart on the destination type (source: 'birthYear', destination: 'birthYear')."
        );
    }

    #[test]
    fn test_configuration_resolves_mismatch() {
        let mut mapper = Mapper::new();
        mapper
            .create_map(person(), person_dto())
            .for_member(
                "age",
                member(|opts| {
                    let year = opts.map_from("birthYear")?.as_i64()?;
                    Some(json!(2024 - year))
                }),
            )
            .unwrap();

        assert!(mapper.assert_configuration_is_valid(true).is_ok());
    }

    #[test]
    fn test_ignored_source_member_is_accepted() {
        let mut mapper = Mapper::new();
        mapper
            .create_map(person(), TypeClass::new("NameOnly", || json!({"name": null})))
            .for_source_member("birthYear", member(|opts| {
                opts.ignore();
                None
            }))
            .unwrap();

        assert!(mapper.assert_configuration_is_valid(true).is_ok());
    }

    #[test]
    fn test_configured_unknown_destination_reported() {
        let mut mapper = Mapper::new();
        mapper
            .create_map(person_dto(), person_dto())
            .for_member("nickname", "none")
            .unwrap();

        let err = mapper.assert_configuration_is_valid(true).unwrap_err();
        assert!(
            err.to_string()
                .contains("configured destination member does not exist on the destination type")
        );
        assert!(err.to_string().contains("destination: 'nickname'"));
    }

    #[test]
    fn test_configured_unknown_source_member_reported() {
        let mut mapper = Mapper::new();
        mapper
            .create_map(person_dto(), person_dto())
            .for_source_member("nickname", member(|opts| opts.intermediate_property_value().cloned()))
            .unwrap();

        let err = mapper.assert_configuration_is_valid(true).unwrap_err();
        assert!(err.to_string().contains("(source: 'nickname'"));
    }

    #[test]
    fn test_profile_naming_is_considered() {
        let mut mapper = Mapper::new();
        mapper.add_profile(
            Profile::new("api")
                .with_source_member_naming_convention(PascalCaseNamingConvention)
                .with_destination_member_naming_convention(CamelCaseNamingConvention),
        );
        mapper
            .create_map(
                TypeClass::new("ApiPerson", || json!({"FullName": null})),
                TypeClass::new("Person", || json!({"fullName": null})),
            )
            .with_profile("api")
            .unwrap();

        assert!(mapper.assert_configuration_is_valid(true).is_ok());
    }
}
