//! The SFMC to UNIX server to S3 ETL pipeline diagram.

use crate::error::Result;
use crate::ir::{BuiltinIcon, Diagram, GraphAttr, Icon};

pub const TITLE: &str = "Sales Force Marketing Cloud (SFMC) To UNIX Server To S3 ETL";
pub const SFMC_LOGO: &str = "salesforce-marketing-cloud-seeklogo.png";

pub const SFMC_SERVER: &str = "sfmc_server";
pub const SFMC_DOWNLOAD: &str = "sfmc_download";
pub const S3_UPLOAD: &str = "s3_upload";
pub const S3_INGESTION_BUCKET: &str = "s3_ingestion_bucket";

pub const UNIX_SERVER_CLUSTER: &str = "UNIX Server";

/// Node ids in pipeline order.
pub const CHAIN: [&str; 4] = [SFMC_SERVER, SFMC_DOWNLOAD, S3_UPLOAD, S3_INGESTION_BUCKET];

pub fn sfmc_to_s3_etl() -> Result<Diagram> {
    let mut diagram = Diagram::new(TITLE);
    diagram.graph_attr = GraphAttr {
        font_size: Some(20.0),
        bgcolor: Some("transparent".to_string()),
        font_color: None,
    };

    diagram.add_node(SFMC_SERVER, "Sfmc Server", Icon::Custom(SFMC_LOGO.into()))?;

    let unix = diagram.add_cluster(UNIX_SERVER_CLUSTER);
    diagram.add_node_in(unix, SFMC_DOWNLOAD, "SFMC Download", Icon::Builtin(BuiltinIcon::Bash))?;
    diagram.add_node_in(unix, S3_UPLOAD, "SFMC Upload", Icon::Builtin(BuiltinIcon::Bash))?;

    diagram.add_node(
        S3_INGESTION_BUCKET,
        "S3 Ingestion Layer",
        Icon::Builtin(BuiltinIcon::S3),
    )?;

    diagram.chain(&CHAIN)?;
    Ok(diagram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_four_node_chain() {
        let diagram = sfmc_to_s3_etl().unwrap();
        diagram.validate().unwrap();

        let labels: Vec<&str> = diagram.nodes.iter().map(|node| node.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Sfmc Server", "SFMC Download", "SFMC Upload", "S3 Ingestion Layer"]
        );

        let edges: Vec<(&str, &str)> = diagram
            .edges
            .iter()
            .map(|edge| (edge.from.as_str(), edge.to.as_str()))
            .collect();
        assert_eq!(
            edges,
            vec![
                (SFMC_SERVER, SFMC_DOWNLOAD),
                (SFMC_DOWNLOAD, S3_UPLOAD),
                (S3_UPLOAD, S3_INGESTION_BUCKET),
            ]
        );
    }

    #[test]
    fn only_the_bash_steps_sit_in_the_unix_cluster() {
        let diagram = sfmc_to_s3_etl().unwrap();
        assert_eq!(diagram.clusters.len(), 1);
        assert_eq!(diagram.clusters[0].label, UNIX_SERVER_CLUSTER);
        assert_eq!(diagram.clusters[0].nodes, vec![SFMC_DOWNLOAD, S3_UPLOAD]);
        assert_eq!(diagram.node(SFMC_SERVER).unwrap().cluster, None);
        assert_eq!(diagram.node(S3_INGESTION_BUCKET).unwrap().cluster, None);
    }

    #[test]
    fn output_name_and_graph_attributes() {
        let diagram = sfmc_to_s3_etl().unwrap();
        assert_eq!(
            diagram.filename("png"),
            "sales_force_marketing_cloud_(sfmc)_to_unix_server_to_s3_etl.png"
        );
        assert_eq!(diagram.graph_attr.font_size, Some(20.0));
        assert_eq!(diagram.graph_attr.bgcolor.as_deref(), Some("transparent"));
    }
}
