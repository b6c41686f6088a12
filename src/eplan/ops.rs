//! The closed set of supported operations.
//!
//! Rather than forwarding arbitrary action names to the host, the crate
//! exposes a fixed catalogue: each variant carries its own typed parameter
//! set and knows whether the underlying host action pops dialogs and must
//! run through the quiet-execution bridge. Anything outside this set is
//! rejected at the tool layer before any transport I/O happens.
//!
//! Parameter names and defaults follow the host's command-line interpreter
//! conventions (keys uppercased, booleans rendered as `1`/`0`).

use serde::Deserialize;

use crate::eplan::action::ActionRequest;

fn default_copies() -> i64 {
    1
}

fn default_image_format() -> String {
    "PNG".to_string()
}

fn default_colour_depth() -> i64 {
    24
}

fn default_image_width() -> i64 {
    1024
}

fn default_filename_pattern() -> String {
    "*.*".to_string()
}

/// Every operation the tool surface can invoke, with its parameter schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Operation {
    /// Open a project file. Host action `ProjectOpen`.
    OpenProject {
        project_path: String,
        /// `Standard`, `ReadOnly` or `Exclusive`.
        open_mode: Option<String>,
    },
    /// Close the current project. Pops a confirmation dialog, so it runs
    /// through the quiet bridge. Host action `XPrjActionProjectClose`.
    CloseProject,
    /// Back up a project to an archive. Host action `backup`.
    BackupProject {
        destination_path: String,
        archive_name: String,
        project_name: Option<String>,
        comment: Option<String>,
        /// `BACKUP`, `SOURCEOUT` or `ARCHIVE`.
        backup_method: Option<String>,
        #[serde(default)]
        include_external_documents: bool,
        #[serde(default)]
        include_images: bool,
    },
    /// Back up master data (symbols, forms, macros, ...) to an archive.
    /// Host action `backup`.
    BackupMasterData {
        destination_path: String,
        archive_name: String,
        source_path: String,
        /// `SYMBOLS`, `MACROS`, `FORMS`, `ARTICLES`, `LANGUAGES`,
        /// `STANDARDSHEET` or `STATIONDATA`.
        md_type: String,
        /// File pattern within the source directory.
        #[serde(default = "default_filename_pattern")]
        filename: String,
        comment: Option<String>,
    },
    /// Restore a project from an archive. May prompt to overwrite, so it
    /// runs through the quiet bridge. Host action `restore`.
    RestoreProject {
        archive_name: String,
        project_name: String,
        #[serde(default)]
        unpack_project: bool,
    },
    /// Restore master data from an archive into a directory. Host action
    /// `restore`.
    RestoreMasterData {
        archive_name: String,
        destination_path: String,
    },
    /// Export the project as a single PDF. Host action `export`.
    ExportPdf {
        export_file: String,
        project_name: Option<String>,
        export_scheme: Option<String>,
        /// 0 colour, 1 black/white, 2 greyscale, 3 white inverted.
        #[serde(default)]
        black_white: i64,
        language: Option<String>,
    },
    /// Export every page as an image file. Host action `export`.
    ExportImages {
        destination_path: String,
        project_name: Option<String>,
        /// `PNG`, `TIF`, `GIF`, `JPG` or `BMP`.
        #[serde(default = "default_image_format")]
        format: String,
        #[serde(default = "default_colour_depth")]
        colour_depth: i64,
        #[serde(default = "default_image_width")]
        image_width: i64,
    },
    /// Export the project as DXF files. Host action `export`.
    ExportDxf {
        destination_path: String,
        project_name: Option<String>,
        export_scheme: Option<String>,
        language: Option<String>,
    },
    /// Export the project as DWG files. Host action `export`.
    ExportDwg {
        destination_path: String,
        project_name: Option<String>,
        export_scheme: Option<String>,
        language: Option<String>,
    },
    /// Import a PXF/EPJ project. Host action `import`.
    ImportProject {
        import_file: String,
        project_name: String,
        #[serde(default)]
        run_check_after_import: bool,
    },
    /// Print the project. Prompts for a printer, so it runs through the
    /// quiet bridge. Host action `print`.
    PrintProject {
        project_name: Option<String>,
        printer_name: Option<String>,
        #[serde(default = "default_copies")]
        copies: i64,
    },
    /// Run the project verification. Host action `check`.
    CheckProject {
        project_name: Option<String>,
        verification_scheme: Option<String>,
    },
    /// Regenerate connection data. Host action `generate`.
    GenerateConnections {
        project_name: Option<String>,
        #[serde(default)]
        rebuild_all: bool,
    },
    /// Generate window/symbol macros from the project pages. Host action
    /// `generatemacros`.
    GenerateMacros {
        project_name: Option<String>,
        destination_path: Option<String>,
        scheme: Option<String>,
    },
    /// Update report/evaluation pages. Host action `reports`.
    UpdateReports { project_name: Option<String> },
    /// Renumber device tags. Host action `renumber`.
    RenumberDevices {
        project_name: Option<String>,
        config_scheme: Option<String>,
        /// Only renumber tags still carrying a `?` placeholder.
        #[serde(default)]
        post_numerate_only: bool,
    },
    /// Produce a label output file. Host action `label`.
    CreateLabels {
        destination_file: String,
        project_name: Option<String>,
        config_scheme: Option<String>,
        language: Option<String>,
    },
    /// Translate project texts from the translation database. Host action
    /// `translate`.
    TranslateProject { project_name: Option<String> },
    /// Compress the project database. Host action `compress`.
    CompressProject { project_name: Option<String> },
    /// Query the path of the currently selected project. Host action
    /// `selectionset`.
    GetCurrentProject,
    /// Write one project property. Host action
    /// `XEsSetProjectPropertyAction`.
    SetProjectProperty {
        property_id: String,
        value: String,
        project_name: Option<String>,
    },
}

impl Operation {
    /// The host action name this operation maps to.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::OpenProject { .. } => "ProjectOpen",
            Self::CloseProject => "XPrjActionProjectClose",
            Self::BackupProject { .. } | Self::BackupMasterData { .. } => "backup",
            Self::RestoreProject { .. } | Self::RestoreMasterData { .. } => "restore",
            Self::ExportPdf { .. }
            | Self::ExportImages { .. }
            | Self::ExportDxf { .. }
            | Self::ExportDwg { .. } => "export",
            Self::ImportProject { .. } => "import",
            Self::PrintProject { .. } => "print",
            Self::CheckProject { .. } => "check",
            Self::GenerateConnections { .. } => "generate",
            Self::GenerateMacros { .. } => "generatemacros",
            Self::UpdateReports { .. } => "reports",
            Self::RenumberDevices { .. } => "renumber",
            Self::CreateLabels { .. } => "label",
            Self::TranslateProject { .. } => "translate",
            Self::CompressProject { .. } => "compress",
            Self::GetCurrentProject => "selectionset",
            Self::SetProjectProperty { .. } => "XEsSetProjectPropertyAction",
        }
    }

    /// Whether the host action pops interactive dialogs and must be wrapped
    /// in a quiet-mode script.
    #[must_use]
    pub const fn requires_quiet_mode(&self) -> bool {
        matches!(
            self,
            Self::CloseProject | Self::RestoreProject { .. } | Self::PrintProject { .. }
        )
    }

    /// Builds the action request for this operation.
    #[must_use]
    pub fn request(&self) -> ActionRequest {
        let request = match self.clone() {
            Self::OpenProject {
                project_path,
                open_mode,
            } => ActionRequest::new("ProjectOpen")
                .param("Project", project_path)
                .opt_param("OpenMode", open_mode),

            Self::CloseProject => ActionRequest::new("XPrjActionProjectClose"),

            Self::BackupProject {
                destination_path,
                archive_name,
                project_name,
                comment,
                backup_method,
                include_external_documents,
                include_images,
            } => ActionRequest::new("backup")
                .param("TYPE", "PROJECT")
                .opt_param("PROJECTNAME", project_name)
                .param("DESTINATIONPATH", destination_path)
                .param("ARCHIVENAME", archive_name)
                .opt_param("COMMENT", comment)
                .param("INCLEXTDOCS", include_external_documents)
                .param("INCLIMAGES", include_images)
                .param(
                    "BACKUPMETHOD",
                    backup_method.unwrap_or_else(|| "BACKUP".to_string()),
                ),

            Self::BackupMasterData {
                destination_path,
                archive_name,
                source_path,
                md_type,
                filename,
                comment,
            } => ActionRequest::new("backup")
                .param("TYPE", "MASTERDATA")
                .param("DESTINATIONPATH", destination_path)
                .param("ARCHIVENAME", archive_name)
                .param("SOURCEPATH", source_path)
                .param("MDTYPE", md_type)
                .param("FILENAME", filename)
                .opt_param("COMMENT", comment),

            Self::RestoreProject {
                archive_name,
                project_name,
                unpack_project,
            } => ActionRequest::new("restore")
                .param("TYPE", "PROJECT")
                .param("ARCHIVENAME", archive_name)
                .param("PROJECTNAME", project_name)
                .param("UNPACKPROJECT", unpack_project),

            Self::RestoreMasterData {
                archive_name,
                destination_path,
            } => ActionRequest::new("restore")
                .param("TYPE", "MASTERDATA")
                .param("ARCHIVENAME", archive_name)
                .param("DESTINATIONPATH", destination_path),

            Self::ExportPdf {
                export_file,
                project_name,
                export_scheme,
                black_white,
                language,
            } => ActionRequest::new("export")
                .param("TYPE", "PDFPROJECTSCHEME")
                .opt_param("PROJECTNAME", project_name)
                .param("EXPORTFILE", export_file)
                .opt_param("EXPORTSCHEME", export_scheme)
                .param("BLACKWHITE", black_white)
                .opt_param("LANGUAGE", language),

            Self::ExportImages {
                destination_path,
                project_name,
                format,
                colour_depth,
                image_width,
            } => ActionRequest::new("export")
                .param("TYPE", "GRAPHICPROJECT")
                .opt_param("PROJECTNAME", project_name)
                .param("DESTINATIONPATH", destination_path)
                .param("FORMAT", format)
                .param("COLORDEPTH", colour_depth)
                .param("IMAGEWIDTH", image_width),

            Self::ExportDxf {
                destination_path,
                project_name,
                export_scheme,
                language,
            } => ActionRequest::new("export")
                .param("TYPE", "DXFPROJECT")
                .opt_param("PROJECTNAME", project_name)
                .param("DESTINATIONPATH", destination_path)
                .opt_param("EXPORTSCHEME", export_scheme)
                .opt_param("LANGUAGE", language),

            Self::ExportDwg {
                destination_path,
                project_name,
                export_scheme,
                language,
            } => ActionRequest::new("export")
                .param("TYPE", "DWGPROJECT")
                .opt_param("PROJECTNAME", project_name)
                .param("DESTINATIONPATH", destination_path)
                .opt_param("EXPORTSCHEME", export_scheme)
                .opt_param("LANGUAGE", language),

            Self::ImportProject {
                import_file,
                project_name,
                run_check_after_import,
            } => ActionRequest::new("import")
                .param("TYPE", "PXFPROJECT")
                .param("IMPORTFILE", import_file)
                .param("PROJECTNAME", project_name)
                .param("VERIFY", run_check_after_import),

            Self::PrintProject {
                project_name,
                printer_name,
                copies,
            } => ActionRequest::new("print")
                .param("TYPE", "PROJECT")
                .opt_param("PROJECTNAME", project_name)
                .opt_param("PRINTERNAME", printer_name)
                .param("NUMBER", copies),

            Self::CheckProject {
                project_name,
                verification_scheme,
            } => ActionRequest::new("check")
                .param("TYPE", "PROJECT")
                .opt_param("PROJECTNAME", project_name)
                .opt_param("VERIFICATIONSCHEME", verification_scheme),

            Self::GenerateConnections {
                project_name,
                rebuild_all,
            } => {
                let request = ActionRequest::new("generate")
                    .param("TYPE", "CONNECTIONS")
                    .opt_param("PROJECTNAME", project_name);
                if rebuild_all {
                    request.param("REBUILDALLCONNECTIONS", true)
                } else {
                    request
                }
            }

            Self::GenerateMacros {
                project_name,
                destination_path,
                scheme,
            } => ActionRequest::new("generatemacros")
                .opt_param("PROJECTNAME", project_name)
                .opt_param("DESTINATIONPATH", destination_path)
                .opt_param("SCHEME", scheme),

            Self::UpdateReports { project_name } => ActionRequest::new("reports")
                .param("TYPE", "PROJECT")
                .opt_param("PROJECTNAME", project_name),

            Self::RenumberDevices {
                project_name,
                config_scheme,
                post_numerate_only,
            } => ActionRequest::new("renumber")
                .param("TYPE", "DEVICES")
                .opt_param("PROJECTNAME", project_name)
                .opt_param("CONFIGSCHEME", config_scheme)
                .param("POSTNUMERATE", post_numerate_only),

            Self::CreateLabels {
                destination_file,
                project_name,
                config_scheme,
                language,
            } => ActionRequest::new("label")
                .opt_param("PROJECTNAME", project_name)
                .param("DESTINATIONFILE", destination_file)
                .opt_param("CONFIGSCHEME", config_scheme)
                .opt_param("LANGUAGE", language),

            Self::TranslateProject { project_name } => ActionRequest::new("translate")
                .param("TYPE", "TRANSLATEPROJECT")
                .opt_param("PROJECTNAME", project_name),

            Self::CompressProject { project_name } => {
                ActionRequest::new("compress").opt_param("PROJECTNAME", project_name)
            }

            Self::GetCurrentProject => {
                ActionRequest::new("selectionset").param("TYPE", "CURRENTPROJECT")
            }

            Self::SetProjectProperty {
                property_id,
                value,
                project_name,
            } => ActionRequest::new("XEsSetProjectPropertyAction")
                .opt_param("PROJECTNAME", project_name)
                .param("PROPERTYID", property_id)
                .param("VALUE", value),
        };

        if self.requires_quiet_mode() {
            request.quiet()
        } else {
            request
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_project_renders_path_and_mode() {
        let op = Operation::OpenProject {
            project_path: r"C:\Projects\demo.elk".to_string(),
            open_mode: Some("ReadOnly".to_string()),
        };
        let action = op.request().to_action_string();
        assert_eq!(
            action,
            r#"ProjectOpen /Project:"C:\\Projects\\demo.elk" /OpenMode:"ReadOnly""#
        );
    }

    #[test]
    fn close_project_is_quiet_and_parameterless() {
        let op = Operation::CloseProject;
        let request = op.request();
        assert!(request.requires_quiet_mode);
        assert_eq!(request.to_action_string(), "XPrjActionProjectClose");
    }

    #[test]
    fn quiet_flag_matches_the_catalogue() {
        assert!(Operation::CloseProject.requires_quiet_mode());
        assert!(Operation::RestoreProject {
            archive_name: "a.zw1".to_string(),
            project_name: "p.elk".to_string(),
            unpack_project: false,
        }
        .requires_quiet_mode());
        assert!(Operation::PrintProject {
            project_name: None,
            printer_name: None,
            copies: 1,
        }
        .requires_quiet_mode());
        assert!(!Operation::GetCurrentProject.requires_quiet_mode());
        assert!(!Operation::CompressProject { project_name: None }.requires_quiet_mode());
    }

    #[test]
    fn backup_renders_booleans_as_digits() {
        let op = Operation::BackupProject {
            destination_path: r"D:\Backups".to_string(),
            archive_name: "demo.zw1".to_string(),
            project_name: None,
            comment: None,
            backup_method: None,
            include_external_documents: true,
            include_images: false,
        };
        let action = op.request().to_action_string();
        assert!(action.starts_with(r#"backup /TYPE:"PROJECT""#));
        assert!(action.contains("/INCLEXTDOCS:1"));
        assert!(action.contains("/INCLIMAGES:0"));
        assert!(action.contains(r#"/BACKUPMETHOD:"BACKUP""#));
        // Optional parameters that were not provided are absent entirely.
        assert!(!action.contains("PROJECTNAME"));
        assert!(!action.contains("COMMENT"));
    }

    #[test]
    fn export_pdf_defaults_to_colour() {
        let op = Operation::ExportPdf {
            export_file: "/tmp/out.pdf".to_string(),
            project_name: None,
            export_scheme: None,
            black_white: 0,
            language: None,
        };
        let action = op.request().to_action_string();
        assert!(action.contains(r#"/TYPE:"PDFPROJECTSCHEME""#));
        assert!(action.contains("/BLACKWHITE:0"));
    }

    #[test]
    fn generate_connections_only_emits_rebuild_when_set() {
        let incremental = Operation::GenerateConnections {
            project_name: None,
            rebuild_all: false,
        };
        assert!(!incremental
            .request()
            .to_action_string()
            .contains("REBUILDALLCONNECTIONS"));

        let full = Operation::GenerateConnections {
            project_name: None,
            rebuild_all: true,
        };
        assert!(full
            .request()
            .to_action_string()
            .contains("/REBUILDALLCONNECTIONS:1"));
    }

    #[test]
    fn masterdata_backup_and_restore_use_the_masterdata_type() {
        let backup = Operation::BackupMasterData {
            destination_path: r"D:\Backups".to_string(),
            archive_name: "symbols.zw2".to_string(),
            source_path: r"C:\MasterData\Symbols".to_string(),
            md_type: "SYMBOLS".to_string(),
            filename: "*.*".to_string(),
            comment: None,
        };
        let action = backup.request().to_action_string();
        assert!(action.starts_with(r#"backup /TYPE:"MASTERDATA""#));
        assert!(action.contains(r#"/MDTYPE:"SYMBOLS""#));
        assert!(action.contains(r#"/FILENAME:"*.*""#));

        let restore = Operation::RestoreMasterData {
            archive_name: r"D:\Backups\symbols.zw2".to_string(),
            destination_path: r"C:\MasterData\Symbols".to_string(),
        };
        let action = restore.request().to_action_string();
        assert!(action.starts_with(r#"restore /TYPE:"MASTERDATA""#));
        // Master-data restore does not prompt; only the project restore
        // needs dialog suppression.
        assert!(!restore.requires_quiet_mode());
    }

    #[test]
    fn dxf_and_dwg_exports_share_the_export_action() {
        let dxf = Operation::ExportDxf {
            destination_path: r"D:\Out\dxf".to_string(),
            project_name: None,
            export_scheme: None,
            language: None,
        };
        assert_eq!(
            dxf.request().to_action_string(),
            r#"export /TYPE:"DXFPROJECT" /DESTINATIONPATH:"D:\\Out\\dxf""#
        );

        let dwg = Operation::ExportDwg {
            destination_path: r"D:\Out\dwg".to_string(),
            project_name: None,
            export_scheme: Some("DWG standard".to_string()),
            language: None,
        };
        let action = dwg.request().to_action_string();
        assert!(action.contains(r#"/TYPE:"DWGPROJECT""#));
        assert!(action.contains(r#"/EXPORTSCHEME:"DWG standard""#));
    }

    #[test]
    fn generate_macros_emits_only_provided_parameters() {
        let op = Operation::GenerateMacros {
            project_name: None,
            destination_path: Some(r"D:\Macros".to_string()),
            scheme: None,
        };
        assert_eq!(
            op.request().to_action_string(),
            r#"generatemacros /DESTINATIONPATH:"D:\\Macros""#
        );
    }

    #[test]
    fn get_current_project_queries_the_selection_set() {
        let action = Operation::GetCurrentProject.request().to_action_string();
        assert_eq!(action, r#"selectionset /TYPE:"CURRENTPROJECT""#);
    }

    #[test]
    fn set_project_property_carries_id_and_value() {
        let op = Operation::SetProjectProperty {
            property_id: "10013".to_string(),
            value: "Revised".to_string(),
            project_name: Some("demo.elk".to_string()),
        };
        let action = op.request().to_action_string();
        assert_eq!(
            action,
            r#"XEsSetProjectPropertyAction /PROJECTNAME:"demo.elk" /PROPERTYID:"10013" /VALUE:"Revised""#
        );
    }

    #[test]
    fn action_names_cover_the_catalogue() {
        assert_eq!(Operation::CloseProject.action_name(), "XPrjActionProjectClose");
        assert_eq!(Operation::GetCurrentProject.action_name(), "selectionset");
        assert_eq!(
            Operation::TranslateProject { project_name: None }.action_name(),
            "translate"
        );
    }
}
