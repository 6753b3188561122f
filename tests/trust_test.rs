mod common;

mod trust_tests {
    use super::common::{issue, issue_with, IssueOptions, Pki};
    use hosted_discovery::cert::Certificate;
    use hosted_discovery::trust::{validate_chain, TrustRootError, TrustRootSet};
    use once_cell::sync::Lazy;
    use std::fs;
    use time::{Duration, OffsetDateTime};

    static PKI: Lazy<Pki> = Lazy::new(Pki::new);

    #[test]
    fn test_leaf_with_intermediate_is_trusted() {
        let trusted = validate_chain(
            &PKI.example_com.certificate(),
            &[PKI.intermediate.certificate()],
            &PKI.trust_roots(),
        )
        .unwrap();
        assert!(trusted);
    }

    #[test]
    fn test_leaf_without_intermediate_is_not_trusted() {
        let trusted =
            validate_chain(&PKI.example_com.certificate(), &[], &PKI.trust_roots()).unwrap();
        assert!(!trusted);
    }

    #[test]
    fn test_intermediate_directly_under_root_is_trusted() {
        let trusted =
            validate_chain(&PKI.intermediate.certificate(), &[], &PKI.trust_roots()).unwrap();
        assert!(trusted);
    }

    #[test]
    fn test_root_itself_is_trusted() {
        let trusted = PKI
            .trust_roots()
            .verify(&PKI.root.certificate(), &[])
            .unwrap();
        assert!(trusted);
    }

    #[test]
    fn test_unrelated_root_is_not_trusted() {
        let other_root = issue("Some Other Root", None, true);
        let leaf = issue("example.com", Some(&other_root), false);

        let trusted = PKI
            .trust_roots()
            .verify(&leaf.certificate(), &[other_root.certificate()])
            .unwrap();
        assert!(!trusted);
    }

    #[test]
    fn test_non_ca_issuer_is_not_trusted() {
        // a leaf certificate cannot act as an intermediate
        let rogue = issue("rogue.example.com", Some(&PKI.example_com), false);

        let trusted = PKI
            .trust_roots()
            .verify(
                &rogue.certificate(),
                &[PKI.example_com.certificate(), PKI.intermediate.certificate()],
            )
            .unwrap();
        assert!(!trusted);
    }

    #[test]
    fn test_path_length_constraint_is_enforced() {
        let limited = issue_with(
            "Limited Intermediate",
            Some(&PKI.root),
            true,
            IssueOptions {
                pathlen: Some(0),
                ..Default::default()
            },
        );
        let sub_ca = issue("Sub CA", Some(&limited), true);
        let leaf = issue("example.com", Some(&sub_ca), false);
        let direct_leaf = issue("example.com", Some(&limited), false);
        let roots = PKI.trust_roots();

        assert!(!roots
            .verify(
                &leaf.certificate(),
                &[sub_ca.certificate(), limited.certificate()]
            )
            .unwrap());
        assert!(roots
            .verify(&direct_leaf.certificate(), &[limited.certificate()])
            .unwrap());
    }

    #[test]
    fn test_path_length_allows_declared_depth() {
        let intermediate = issue_with(
            "Intermediate With Room",
            Some(&PKI.root),
            true,
            IssueOptions {
                pathlen: Some(1),
                ..Default::default()
            },
        );
        let sub_ca = issue("Sub CA", Some(&intermediate), true);
        let leaf = issue("example.com", Some(&sub_ca), false);

        let trusted = PKI
            .trust_roots()
            .verify(
                &leaf.certificate(),
                &[sub_ca.certificate(), intermediate.certificate()],
            )
            .unwrap();
        assert!(trusted);
    }

    #[test]
    fn test_unknown_critical_extension_is_not_trusted() {
        let options = || IssueOptions {
            critical_oid: Some("1.3.6.1.4.1.55555.1"),
            ..Default::default()
        };
        let leaf = issue_with("example.com", Some(&PKI.intermediate), false, options());
        let marked_ca = issue_with("Marked Intermediate", Some(&PKI.root), true, options());
        let leaf_under_marked = issue("example.com", Some(&marked_ca), false);
        let roots = PKI.trust_roots();

        assert!(!roots
            .verify(&leaf.certificate(), &[PKI.intermediate.certificate()])
            .unwrap());
        assert!(!roots
            .verify(&leaf_under_marked.certificate(), &[marked_ca.certificate()])
            .unwrap());
    }

    #[test]
    fn test_renewed_intermediate_is_found_after_expired_one() {
        let renewed = issue("Renewed Intermediate", Some(&PKI.root), true);
        let expired = issue_with(
            "Renewed Intermediate",
            Some(&PKI.root),
            true,
            IssueOptions {
                key: Some(renewed.key.clone()),
                expired: true,
                ..Default::default()
            },
        );
        let leaf = issue("example.com", Some(&renewed), false);
        let roots = PKI.trust_roots();

        assert!(roots
            .verify(
                &leaf.certificate(),
                &[expired.certificate(), renewed.certificate()]
            )
            .unwrap());
        assert!(!roots
            .verify(&leaf.certificate(), &[expired.certificate()])
            .unwrap());
    }

    #[test]
    fn test_expired_chain_is_not_trusted() {
        let roots = PKI
            .trust_roots()
            .with_verification_time(OffsetDateTime::now_utc() + Duration::days(3650));

        let trusted = roots
            .verify(
                &PKI.example_com.certificate(),
                &[PKI.intermediate.certificate()],
            )
            .unwrap();
        assert!(!trusted);
    }

    #[test]
    fn test_not_yet_valid_chain_is_not_trusted() {
        let roots = PKI
            .trust_roots()
            .with_verification_time(OffsetDateTime::now_utc() - Duration::days(2));

        let trusted = roots
            .verify(
                &PKI.example_com.certificate(),
                &[PKI.intermediate.certificate()],
            )
            .unwrap();
        assert!(!trusted);
    }

    #[test]
    fn test_common_name_is_lowercased() {
        assert_eq!(
            PKI.example_com.certificate().common_name().unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_load_trust_roots_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("root.pem"), PKI.root.cert.to_pem().unwrap()).unwrap();
        fs::write(
            dir.path().join("intermediate.der"),
            PKI.intermediate.cert.to_der().unwrap(),
        )
        .unwrap();
        fs::write(dir.path().join("README"), b"not a certificate").unwrap();

        let roots = TrustRootSet::from_paths([dir.path()]).unwrap();

        assert_eq!(
            roots.roots(),
            &[PKI.intermediate.certificate(), PKI.root.certificate()]
        );
        assert!(roots
            .verify(&PKI.example_com.certificate(), &[])
            .unwrap());
    }

    #[test]
    fn test_load_pem_bundle_file() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("bundle.pem");
        let mut pem = PKI.root.cert.to_pem().unwrap();
        pem.extend(PKI.intermediate.cert.to_pem().unwrap());
        fs::write(&bundle, pem).unwrap();

        let roots = TrustRootSet::from_paths([&bundle]).unwrap();
        assert_eq!(roots.roots().len(), 2);
    }

    #[test]
    fn test_load_bundled_test_root() {
        let roots = TrustRootSet::from_paths(["tests/testdata/root.pem"]).unwrap();
        assert_eq!(
            roots.roots()[0].common_name().unwrap(),
            "hosted discovery test root"
        );
    }

    #[test]
    fn test_from_env_requires_variable() {
        std::env::remove_var(hosted_discovery::trust::TRUST_ROOTS_ENV);
        let result = TrustRootSet::from_env();
        assert!(matches!(result, Err(TrustRootError::MissingEnv(..))));
    }

    #[test]
    fn test_der_and_pem_decode_to_same_certificate() {
        let der = PKI.root.cert.to_der().unwrap();
        let pem = PKI.root.cert.to_pem().unwrap();

        assert_eq!(
            Certificate::parse_pem_or_der(&der).unwrap(),
            Certificate::parse_pem_or_der(&pem).unwrap()
        );
    }
}
