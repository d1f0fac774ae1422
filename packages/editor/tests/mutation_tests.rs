//! Structured model mutations and the credential field invariant

use sitefile_editor::{
    codec, credential_fields, BasicAuthData, CredentialField, Directive, DocumentState, Mutation,
    MutationError, Site, SiteFile,
};

fn doc(source: &str) -> DocumentState {
    let model = sitefile_grammar::parse(source).unwrap();
    DocumentState::loaded(model, source.to_string(), "Caddyfile".to_string())
}

fn set_field(doc: &mut DocumentState, field: CredentialField, value: &str) {
    doc.apply(&Mutation::SetBasicAuthField {
        site: 0,
        directive: 0,
        field,
        value: value.to_string(),
    })
    .unwrap();
}

#[test]
fn test_add_site_and_directive_defaults() {
    let mut doc = doc("");
    doc.apply(&Mutation::AddSite).unwrap();
    doc.apply(&Mutation::AddDirective { site: 0 }).unwrap();

    let site = &doc.sites[0];
    assert_eq!(site.address, "");
    assert_eq!(site.notes, "");
    assert_eq!(site.directives, vec![Directive::default()]);
}

#[test]
fn test_out_of_range_indices() {
    let mut doc = doc("a.com {\n    log\n}");

    assert_eq!(
        doc.apply(&Mutation::RemoveSite { site: 1 }),
        Err(MutationError::OutOfRange {
            what: "site",
            index: 1,
            len: 1
        })
    );
    assert_eq!(
        doc.apply(&Mutation::SetDirectiveArgs {
            site: 0,
            directive: 5,
            args: vec![],
        }),
        Err(MutationError::OutOfRange {
            what: "directive",
            index: 5,
            len: 1
        })
    );
    assert!(doc.is_saved, "failed mutations change nothing");
    assert_eq!(doc.version, 0);
}

#[test]
fn test_credential_fields_encode_only_when_complete() {
    let mut doc = doc("a.com {\n    basicauth\n}");

    set_field(&mut doc, CredentialField::Username, "alice");
    assert!(doc.sites[0].directives[0].args.is_empty());

    set_field(&mut doc, CredentialField::Password, "secret");
    assert_eq!(doc.sites[0].directives[0].args, vec!["alice", "YWxpY2U6c2VjcmV0"]);

    // clearing either field clears the args but keeps the half-entered value
    set_field(&mut doc, CredentialField::Password, "");
    let directive = &doc.sites[0].directives[0];
    assert!(directive.args.is_empty());
    assert_eq!(directive.basicauth_data, Some(BasicAuthData::new("alice", "")));
}

#[test]
fn test_credential_field_on_other_directive_is_rejected() {
    let mut doc = doc("a.com {\n    log\n}");
    let err = doc
        .apply(&Mutation::SetBasicAuthField {
            site: 0,
            directive: 0,
            field: CredentialField::Username,
            value: "x".into(),
        })
        .unwrap_err();
    assert_eq!(err, MutationError::NotBasicAuth("log".into()));
}

#[test]
fn test_rename_to_basicauth_decodes_existing_args() {
    let token = codec::encode("bob", "hunter2");
    let mut doc = doc(&format!("a.com {{\n    respond bob {}\n}}", token));

    doc.apply(&Mutation::SetDirectiveName {
        site: 0,
        directive: 0,
        name: "basicauth".into(),
    })
    .unwrap();
    assert_eq!(
        credential_fields(&doc.sites[0].directives[0]),
        Some(BasicAuthData::new("bob", "hunter2"))
    );

    doc.apply(&Mutation::SetDirectiveName {
        site: 0,
        directive: 0,
        name: "respond".into(),
    })
    .unwrap();
    assert_eq!(doc.sites[0].directives[0].basicauth_data, None);
    assert_eq!(doc.sites[0].directives[0].args[0], "bob");
}

#[test]
fn test_round_trip_up_to_credential_cache() {
    let mut credentials = Directive::new("basicauth", Vec::<String>::new());
    credentials.basicauth_data = Some(BasicAuthData::new("carol", "s3cret pass"));
    let mut model = SiteFile::new(
        vec![
            Site::new("example.com")
                .with_notes("main")
                .with_directive(
                    Directive::new("reverse_proxy", ["localhost:8080"])
                        .with_block(vec![Directive::new("header_up", ["Host", "{host}"])]),
                )
                .with_directive(credentials),
            Site::new(":8080").with_directive(Directive::new("respond", ["Hello, World!", "200"])),
        ],
        vec!["# managed by sitefile".to_string()],
    );
    codec::encode_credential_fields(&mut model.sites);

    let mut reparsed = sitefile_grammar::parse(&sitefile_grammar::generate(&model)).unwrap();
    codec::refresh_credential_cache(&mut reparsed.sites);

    assert!(reparsed.content_eq(&model));
    assert_eq!(
        reparsed.sites[0].directives[1].basicauth_data,
        Some(BasicAuthData::new("carol", "s3cret pass"))
    );
}

#[test]
fn test_header_preset_as_args() {
    let preset = &sitefile_editor::schema::HEADER_PRESETS[0];
    let mut doc = doc("a.com {\n    header\n}");

    doc.apply(&Mutation::SetDirectiveArgs {
        site: 0,
        directive: 0,
        args: preset.args(),
    })
    .unwrap();

    assert_eq!(doc.sites[0].directives[0].args, vec!["-Server"]);
    assert_eq!(
        sitefile_editor::schema::kind_of(&doc.sites[0].directives[0]),
        sitefile_editor::schema::DirectiveKind::Header
    );
}
